//! Quantity parsing and unit-to-gram conversion.
//!
//! Scraped quantities are noisy ("1/2", "2큰술", "약간", "a handful"), so
//! conversion never fails: an unparseable amount counts as 1, and an unknown
//! or blank unit counts as one typical piece.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::TableError;

// =============================================================================
// Data structures
// =============================================================================

/// On-disk unit table format.
#[derive(Deserialize)]
struct UnitTableFile {
    default_piece_grams: f64,
    #[serde(default)]
    metric: HashMap<String, f64>,
    /// Household and count units.
    units: HashMap<String, f64>,
}

/// Immutable unit → grams table.
///
/// Built once and shared by reference; nothing mutates it after construction.
#[derive(Debug, Clone)]
pub struct UnitTable {
    units: HashMap<String, f64>,
    metric: HashMap<String, f64>,
    /// Lowercased keys searched for inside annotated unit text.
    contained: Vec<(String, f64)>,
    default_piece_grams: f64,
}

/// Embedded default table.
static STANDARD_UNITS_JSON: &str = include_str!("data/units.json");

impl UnitTable {
    /// The built-in table covering Korean household measures and common
    /// English units.
    pub fn standard() -> Self {
        Self::from_json(STANDARD_UNITS_JSON).expect("units.json should be a valid unit table")
    }

    /// Parse a unit table from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        let file: UnitTableFile =
            serde_json::from_str(json).map_err(|e| TableError::InvalidUnitTable(e.to_string()))?;

        check_weight("default_piece_grams", file.default_piece_grams)?;
        for (unit, grams) in file.units.iter().chain(file.metric.iter()) {
            check_weight(unit, *grams)?;
        }

        // Household units shadow metric ones. Single ASCII letters ("T", "t")
        // are case-sensitive abbreviations and only match exactly.
        let mut contained: HashMap<String, f64> = HashMap::new();
        for (unit, grams) in file.metric.iter().chain(file.units.iter()) {
            if unit.len() == 1 && unit.is_ascii() && file.units.contains_key(unit) {
                continue;
            }
            contained.insert(unit.to_lowercase(), *grams);
        }
        let mut contained: Vec<(String, f64)> = contained.into_iter().collect();
        contained.sort_by(|(a, _), (b, _)| a.cmp(b));

        Ok(Self {
            units: file.units,
            metric: file.metric,
            contained,
            default_piece_grams: file.default_piece_grams,
        })
    }

    /// Replace the weight used for blank or unknown units.
    pub fn with_default_piece_grams(mut self, grams: f64) -> Self {
        if grams.is_finite() && grams >= 0.0 {
            self.default_piece_grams = grams;
        }
        self
    }

    pub fn default_piece_grams(&self) -> f64 {
        self.default_piece_grams
    }

    /// Grams represented by one of `unit`, or `None` if the unit is blank or unknown.
    ///
    /// Lookup order:
    /// 1. Exact, case-sensitive match ("T" is a tablespoon, "t" a teaspoon)
    /// 2. Exact match after lowercasing
    /// 3. Singular form of a plural ("cups" -> "cup")
    /// 4. The unit that starts earliest in the text, longest first on ties
    ///    ("큰술(15ml)" -> "큰술", "g(1팩)" -> "g", "종이컵" -> "종이컵")
    pub fn grams_per_unit(&self, unit: &str) -> Option<f64> {
        let unit = unit.trim();
        if unit.is_empty() {
            return None;
        }

        if let Some(grams) = self.exact(unit) {
            return Some(grams);
        }

        let lower = unit.to_lowercase();
        if let Some(grams) = self.exact(&lower) {
            return Some(grams);
        }

        if let Some(singular) = lower.strip_suffix('s') {
            if let Some(grams) = self.exact(singular) {
                return Some(grams);
            }
        }

        self.contained_unit(&lower)
    }

    fn contained_unit(&self, text: &str) -> Option<f64> {
        let mut best: Option<(usize, usize, f64)> = None;
        for (key, grams) in &self.contained {
            let Some(start) = text
                .match_indices(key.as_str())
                .map(|(start, _)| start)
                .find(|&start| !key.is_ascii() || is_ascii_word(text, start, key.len()))
            else {
                continue;
            };
            let len = key.chars().count();
            let earlier = match best {
                None => true,
                Some((best_start, best_len, _)) => {
                    start < best_start || (start == best_start && len > best_len)
                }
            };
            if earlier {
                best = Some((start, len, *grams));
            }
        }
        best.map(|(_, _, grams)| grams)
    }

    fn exact(&self, unit: &str) -> Option<f64> {
        self.units
            .get(unit)
            .or_else(|| self.metric.get(unit))
            .copied()
    }

    /// Convert a free-text amount and unit to grams.
    ///
    /// When `unit` is blank, any text after the leading number in `amount`
    /// is used as the unit ("2큰술" is 2 × 큰술).
    pub fn to_grams(&self, amount: &str, unit: &str) -> f64 {
        let amount = amount.trim();
        let (value, rest) = split_leading_amount(amount);
        let value = value.unwrap_or(1.0);

        let unit = if unit.trim().is_empty() { rest } else { unit };
        self.grams_for(value, unit)
    }

    /// Convert an already-numeric amount to grams.
    pub fn grams_for(&self, amount: f64, unit: &str) -> f64 {
        let amount = if amount.is_finite() && amount >= 0.0 {
            amount
        } else {
            1.0
        };
        let per_unit = self
            .grams_per_unit(unit)
            .unwrap_or(self.default_piece_grams);
        amount * per_unit
    }
}

impl Default for UnitTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Whether `text[start..start + len]` stands alone as an ASCII word, allowing a
/// plural "s". Keeps "l" out of "handful" and "g" out of "bag".
fn is_ascii_word(text: &str, start: usize, len: usize) -> bool {
    let before = text[..start].chars().next_back();
    let mut after = text[start + len..].chars();
    let next = match after.next() {
        Some('s') => after.next(),
        other => other,
    };
    let is_letter = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphabetic());
    !is_letter(before) && !is_letter(next)
}

fn check_weight(label: &str, grams: f64) -> Result<(), TableError> {
    if grams.is_finite() && grams >= 0.0 {
        Ok(())
    } else {
        Err(TableError::InvalidUnitTable(format!(
            "{label} must be a non-negative number of grams, got {grams}"
        )))
    }
}

// =============================================================================
// Amount parsing
// =============================================================================

/// Parse an amount string into a decimal value.
///
/// Handles:
/// - Integers: "8" → 8.0
/// - Decimals: "2.5" → 2.5
/// - Fractions: "1/2" → 0.5
/// - Mixed numbers: "1 1/2" → 1.5
/// - Vulgar fractions: "½" → 0.5, "1½" → 1.5
/// - A leading number followed by text: "300g" → 300.0, "2큰술" → 2.0
pub fn parse_amount(amount: &str) -> Option<f64> {
    split_leading_amount(amount.trim()).0
}

/// Split an amount into its leading numeric value and the remaining text.
fn split_leading_amount(amount: &str) -> (Option<f64>, &str) {
    let (token, rest) = take_number(amount);
    let value = parse_token(token);

    // Mixed number: "1 1/2", "2 3/4컵", "1 ½ cups"
    if let Some(whole) = value.filter(|_| token.bytes().all(|b| b.is_ascii_digit())) {
        if rest.starts_with(char::is_whitespace) {
            let (fraction, after) = take_number(rest.trim_start());
            if is_fraction_token(fraction) {
                if let Some(frac) = parse_token(fraction) {
                    return (Some(whole + frac), after.trim());
                }
            }
        }
    }

    (value, rest.trim())
}

/// Split off the leading run of number characters.
fn take_number(s: &str) -> (&str, &str) {
    let end = s
        .char_indices()
        .find(|(_, c)| !is_amount_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s.split_at(end)
}

fn is_fraction_token(token: &str) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if vulgar_fraction(c).is_some() => true,
        _ => token.contains('/') && !token.contains('.'),
    }
}

fn is_amount_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.' || c == '/' || vulgar_fraction(c).is_some()
}

fn parse_token(token: &str) -> Option<f64> {
    if token.is_empty() {
        return None;
    }

    // Trailing vulgar fraction: "½" or "1½"
    if let Some(last) = token.chars().last() {
        if let Some(frac) = vulgar_fraction(last) {
            let whole = &token[..token.len() - last.len_utf8()];
            if whole.is_empty() {
                return Some(frac);
            }
            return whole.parse::<f64>().ok().map(|w| w + frac);
        }
    }

    if token.contains('/') {
        return parse_fraction(token);
    }

    token.parse().ok().filter(|v: &f64| v.is_finite())
}

/// Parse a simple fraction like "1/2" or "3/4".
fn parse_fraction(s: &str) -> Option<f64> {
    let (num, denom) = s.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let denom: f64 = denom.trim().parse().ok()?;
    if denom == 0.0 {
        return None;
    }
    Some(num / denom)
}

fn vulgar_fraction(c: char) -> Option<f64> {
    match c {
        '½' => Some(0.5),
        '⅓' => Some(1.0 / 3.0),
        '⅔' => Some(2.0 / 3.0),
        '¼' => Some(0.25),
        '¾' => Some(0.75),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_tablespoons() {
        let units = UnitTable::standard();
        assert!(approx(units.to_grams("2", "큰술"), 30.0));
        assert!(approx(units.to_grams("2", "tbsp"), 30.0));
        assert!(approx(units.to_grams("2", "T"), 30.0));
        assert!(approx(units.to_grams("2", "t"), 10.0));
    }

    #[test]
    fn test_fraction_of_cup() {
        let units = UnitTable::standard();
        assert!(approx(units.to_grams("1/2", "컵"), 100.0));
        assert!(approx(units.to_grams("1/2", "cup"), 100.0));
        assert!(approx(units.to_grams("1/2", "cups"), 100.0));
    }

    #[test]
    fn test_blank_is_default_piece() {
        let units = UnitTable::standard();
        assert!(approx(units.to_grams("", ""), 50.0));
        assert!(approx(units.to_grams("", ""), units.default_piece_grams()));
    }

    #[test]
    fn test_unknown_unit_uses_piece_weight() {
        let units = UnitTable::standard();
        assert!(approx(units.to_grams("2", "whatsits"), 100.0));
        let heavy = UnitTable::standard().with_default_piece_grams(80.0);
        assert!(approx(heavy.to_grams("2", "whatsits"), 160.0));
    }

    #[test]
    fn test_unparseable_amount_counts_as_one() {
        let units = UnitTable::standard();
        assert!(approx(units.to_grams("some", "큰술"), 15.0));
        assert!(approx(units.to_grams("1/0", "큰술"), 15.0));
    }

    #[test]
    fn test_metric_passthrough() {
        let units = UnitTable::standard();
        assert!(approx(units.to_grams("300", "g"), 300.0));
        assert!(approx(units.to_grams("250", "ml"), 250.0));
        assert!(approx(units.to_grams("1.5", "kg"), 1500.0));
        assert!(approx(units.to_grams("1", "L"), 1000.0));
    }

    #[test]
    fn test_unit_inside_amount_text() {
        let units = UnitTable::standard();
        assert!(approx(units.to_grams("2큰술", ""), 30.0));
        assert!(approx(units.to_grams("300g", ""), 300.0));
        assert!(approx(units.to_grams("약간", ""), 2.0));
    }

    #[test]
    fn test_longest_unit_wins() {
        let units = UnitTable::standard();
        // 종이컵 contains 컵
        assert!(approx(units.to_grams("1", "종이컵"), 180.0));
        assert!(approx(units.to_grams("1", "큰술(15ml)"), 15.0));
        assert!(approx(units.to_grams("1", "봉지"), 100.0));
    }

    #[test]
    fn test_annotated_units() {
        let units = UnitTable::standard();
        assert!(approx(units.to_grams("300", "g(1팩)"), 300.0));
        assert!(approx(units.to_grams("200", "ml(1컵)"), 200.0));
        assert!(approx(units.to_grams("3", "쪽(다진것)"), 15.0));
        assert!(approx(units.to_grams("1", "모(300g)"), 300.0));
        assert!(approx(units.to_grams("1", "컵(200ml)"), 200.0));
        assert!(approx(units.to_grams("2", "kg 내외"), 2000.0));
        assert!(approx(units.to_grams("1", "cups (packed)"), 200.0));
    }

    #[test]
    fn test_ascii_units_need_word_edges() {
        let units = UnitTable::standard();
        // no "g" in "bag", no "l" in "handful", no "t" in "tbsp"
        assert!(approx(units.to_grams("1", "bag"), 50.0));
        assert!(approx(units.to_grams("1", "big handful"), 30.0));
        assert!(approx(units.to_grams("1", "heaped tbsp"), 15.0));
        assert!(approx(units.to_grams("2", "T"), 30.0));
    }

    #[test]
    fn test_mixed_number_with_unit_text() {
        let units = UnitTable::standard();
        assert!(approx(units.to_grams("1 1/2 컵", ""), 300.0));
        assert!(approx(units.to_grams("1 1/2컵", ""), 300.0));
        assert!(approx(units.to_grams("1 1/2", "컵"), 300.0));
        assert!(approx(units.to_grams("2 ½ cups", ""), 500.0));
        // not a fraction, so only the first number counts
        assert!(approx(units.to_grams("2 3", "큰술"), 30.0));
    }

    #[test]
    fn test_count_units() {
        let units = UnitTable::standard();
        assert!(approx(units.to_grams("3", "쪽"), 15.0));
        assert!(approx(units.to_grams("3", "cloves"), 15.0));
        assert!(approx(units.to_grams("1", "모"), 300.0));
        assert!(approx(units.to_grams("2", "장"), 60.0));
    }

    #[test]
    fn test_grams_for_rejects_negative() {
        let units = UnitTable::standard();
        assert!(approx(units.grams_for(-3.0, "g"), 1.0));
        assert!(approx(units.grams_for(f64::NAN, "g"), 1.0));
        assert!(approx(units.grams_for(0.0, "g"), 0.0));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("8"), Some(8.0));
        assert_eq!(parse_amount("2.5"), Some(2.5));
        assert_eq!(parse_amount("1/2"), Some(0.5));
        assert_eq!(parse_amount("1 1/2"), Some(1.5));
        assert_eq!(parse_amount("½"), Some(0.5));
        assert_eq!(parse_amount("1½"), Some(1.5));
        assert_eq!(parse_amount("300g"), Some(300.0));
        assert_eq!(parse_amount("1 1/2컵"), Some(1.5));
        assert_eq!(parse_amount("2 3/4 cups"), Some(2.75));
        assert_eq!(parse_amount("약간"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn test_invalid_unit_table() {
        let bad = r#"{"default_piece_grams": -1, "units": {}}"#;
        assert!(matches!(
            UnitTable::from_json(bad),
            Err(TableError::InvalidUnitTable(_))
        ));
        assert!(UnitTable::from_json("not json").is_err());
    }

    #[test]
    fn test_custom_unit_table() {
        let json = r#"{"default_piece_grams": 10, "units": {"scoop": 30}}"#;
        let units = UnitTable::from_json(json).unwrap();
        assert!(approx(units.to_grams("2", "scoop"), 60.0));
        assert!(approx(units.to_grams("2", "g"), 20.0));
    }
}
