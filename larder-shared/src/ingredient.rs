/// Free-text ingredient line parser
///
/// Recipe pages list ingredients as prose (`"1 ½ cups flour, sifted"`). The
/// parser pulls out a leading quantity, an optional unit, the ingredient
/// name, and a trailing note.
///
/// Quantities may be integers, decimals (`1.5` or `1,5`), grouped thousands
/// (`1,000`), fractions (`1/2`),
/// mixed numbers (`1 1/2`), unicode fractions (`½`, `1½`), or ranges
/// (`2-3`, `2 to 3`), which resolve to the upper bound. A unit is only looked
/// for after a quantity. Lines without a quantity keep their whole text as the
/// name.
///
/// # Example
///
/// ```
/// use larder_shared::ingredient::parse_ingredient_line;
/// use larder_shared::models::unit::MeasurementUnit;
///
/// let parsed = parse_ingredient_line("2 cups of flour, sifted").unwrap();
/// assert_eq!(parsed.quantity, Some(2.0));
/// assert_eq!(parsed.unit, Some(MeasurementUnit::Cup));
/// assert_eq!(parsed.name, "flour");
/// assert_eq!(parsed.note.as_deref(), Some("sifted"));
/// ```

use regex::Regex;
use std::sync::OnceLock;

use crate::models::recipe::IngredientInput;
use crate::models::unit::MeasurementUnit;
use crate::sanitize::clean_text;

/// Longest ingredient name kept
pub const MAX_NAME_CHARS: usize = 255;

/// Longest note kept
pub const MAX_NOTE_CHARS: usize = 255;

/// Largest quantity stored on an ingredient or grocery item
pub const MAX_QUANTITY: f64 = 100_000.0;

/// Whether `q` is a storable quantity: finite, positive, at most [`MAX_QUANTITY`]
pub fn quantity_in_range(q: f64) -> bool {
    q.is_finite() && q > 0.0 && q <= MAX_QUANTITY
}

const UNICODE_FRACTIONS: [(char, &str); 10] = [
    ('½', "1/2"),
    ('⅓', "1/3"),
    ('⅔', "2/3"),
    ('¼', "1/4"),
    ('¾', "3/4"),
    ('⅛', "1/8"),
    ('⅜', "3/8"),
    ('⅝', "5/8"),
    ('⅞', "7/8"),
    ('⅕', "1/5"),
];

/// Structured ingredient
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedIngredient {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<MeasurementUnit>,
    pub note: Option<String>,
}

impl From<ParsedIngredient> for IngredientInput {
    fn from(parsed: ParsedIngredient) -> Self {
        IngredientInput {
            name: parsed.name,
            quantity: parsed.quantity,
            unit: parsed.unit,
            category: None,
            note: parsed.note,
        }
    }
}

fn amount_pattern() -> &'static Regex {
    static AMOUNT: OnceLock<Regex> = OnceLock::new();
    AMOUNT.get_or_init(|| {
        Regex::new(
            r"^(?:(\d+)\s+(\d+)/(\d+)|(\d+)/(\d+)|(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:[.,]\d+)?))",
        )
            .expect("Invalid amount regex")
    })
}

fn range_pattern() -> &'static Regex {
    static RANGE: OnceLock<Regex> = OnceLock::new();
    RANGE.get_or_init(|| Regex::new(r"^\s*(?:-|–|—|to\s)\s*").expect("Invalid range regex"))
}

/// Rewrites unicode vulgar fractions as ASCII, splitting `1½` into `1 1/2`
fn expand_fractions(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 4);
    let mut prev: Option<char> = None;

    for c in input.chars() {
        if let Some((_, ascii)) = UNICODE_FRACTIONS.iter().find(|(f, _)| *f == c) {
            if prev.is_some_and(|p| p.is_ascii_digit()) {
                out.push(' ');
            }
            out.push_str(ascii);
        } else if c == '⁄' {
            out.push('/');
        } else {
            out.push(c);
        }
        prev = Some(c);
    }

    out
}

/// `1,000` and `12,500.5` group thousands; any other comma is a decimal point
fn has_thousands_groups(s: &str) -> bool {
    let integer = s.split('.').next().unwrap_or(s);
    let mut groups = integer.split(',');
    let lead = groups.next().map_or(0, str::len);

    integer.contains(',') && (1..=3).contains(&lead) && groups.all(|g| g.len() == 3)
}

fn parse_number(s: &str) -> Option<f64> {
    let normalized = if has_thousands_groups(s) {
        s.replace(',', "")
    } else {
        s.replace(',', ".")
    };
    normalized.parse::<f64>().ok()
}

fn fraction(numerator: &str, denominator: &str) -> Option<f64> {
    let n = parse_number(numerator)?;
    let d = parse_number(denominator)?;
    (d != 0.0).then(|| n / d)
}

/// Parses one amount at the start of `s`, returning it and the bytes consumed
fn parse_amount(s: &str) -> Option<(f64, usize)> {
    let caps = amount_pattern().captures(s)?;
    let consumed = caps.get(0)?.end();

    let value = if let (Some(whole), Some(n), Some(d)) = (caps.get(1), caps.get(2), caps.get(3)) {
        parse_number(whole.as_str())? + fraction(n.as_str(), d.as_str())?
    } else if let (Some(n), Some(d)) = (caps.get(4), caps.get(5)) {
        fraction(n.as_str(), d.as_str())?
    } else {
        parse_number(caps.get(6)?.as_str())?
    };

    Some((value, consumed))
}

/// Parses a leading quantity or range, returning it and the remaining text
fn parse_quantity(s: &str) -> Option<(f64, &str)> {
    let (first, consumed) = parse_amount(s)?;
    let mut rest = &s[consumed..];
    let mut value = first;

    if let Some(sep) = range_pattern().find(rest) {
        let after = &rest[sep.end()..];
        if let Some((second, used)) = parse_amount(after) {
            value = value.max(second);
            rest = &after[used..];
        }
    }

    Some((value, rest))
}

/// Matches a unit at the start of `s`, trying two-word units first
fn parse_unit(s: &str) -> Option<(MeasurementUnit, &str)> {
    let mut words = s.split_whitespace();
    let first = words.next()?;

    if let Some(second) = words.next() {
        let pair = format!("{} {}", first, second);
        if let Some(unit) = MeasurementUnit::from_alias(&pair) {
            let end = s.find(second)? + second.len();
            return Some((unit, &s[end..]));
        }
    }

    let unit = MeasurementUnit::from_alias(first)?;
    let end = s.find(first)? + first.len();
    Some((unit, &s[end..]))
}

/// Splits a trailing `(note)` or `, note` off a name
fn split_note(name: &str) -> (String, Option<String>) {
    let trimmed = name.trim();

    if trimmed.ends_with(')') {
        if let Some(open) = trimmed.rfind('(') {
            let head = trimmed[..open].trim().trim_end_matches(',').trim();
            let note = trimmed[open + 1..trimmed.len() - 1].trim();
            if !head.is_empty() {
                return (head.to_string(), Some(note.to_string()).filter(|n| !n.is_empty()));
            }
        }
    }

    if let Some((head, note)) = trimmed.split_once(',') {
        let head = head.trim();
        let note = note.trim();
        if !head.is_empty() {
            return (head.to_string(), Some(note.to_string()).filter(|n| !n.is_empty()));
        }
    }

    (trimmed.to_string(), None)
}

fn limit_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect::<String>().trim_end().to_string()
}

/// Parses a free-text ingredient line
///
/// Returns `None` when the line has no text once markup is stripped.
pub fn parse_ingredient_line(line: &str) -> Option<ParsedIngredient> {
    let text = expand_fractions(&clean_text(line, 1000));
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let Some((quantity, rest)) = parse_quantity(text) else {
        return Some(ParsedIngredient {
            name: limit_chars(text, MAX_NAME_CHARS),
            quantity: None,
            unit: None,
            note: None,
        });
    };

    let rest = rest.trim();
    let (unit, rest) = match parse_unit(rest) {
        Some((unit, after)) if !after.trim().is_empty() => (Some(unit), after.trim()),
        _ => (None, rest),
    };

    let rest = rest
        .strip_prefix("of ")
        .or_else(|| rest.strip_prefix("Of "))
        .unwrap_or(rest);

    let (name, note) = split_note(rest);
    let name = if name.is_empty() {
        text.to_string()
    } else {
        name
    };

    Some(ParsedIngredient {
        name: limit_chars(&name, MAX_NAME_CHARS),
        quantity: (quantity > 0.0).then_some(quantity),
        unit,
        note: note.map(|n| limit_chars(&n, MAX_NOTE_CHARS)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ParsedIngredient {
        parse_ingredient_line(line).expect("line should parse")
    }

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn test_integer_and_unit() {
        let p = parse("3 tablespoons butter");
        assert_eq!(p.quantity, Some(3.0));
        assert_eq!(p.unit, Some(MeasurementUnit::Tbsp));
        assert_eq!(p.name, "butter");
        assert_eq!(p.note, None);
    }

    #[test]
    fn test_decimals_with_dot_or_comma() {
        assert!(approx(parse("1.5 kg potatoes").quantity, 1.5));
        assert!(approx(parse("0,25 l milk").quantity, 0.25));
    }

    #[test]
    fn test_thousands_separator() {
        let p = parse("1,000 g flour");
        assert!(approx(p.quantity, 1000.0));
        assert_eq!(p.unit, Some(MeasurementUnit::G));
        assert_eq!(p.name, "flour");

        assert!(approx(parse("2,500.5 ml water").quantity, 2500.5));
        assert!(approx(parse("1,5 cups rice").quantity, 1.5));
    }

    #[test]
    fn test_quantity_in_range() {
        assert!(quantity_in_range(0.25));
        assert!(quantity_in_range(MAX_QUANTITY));
        assert!(!quantity_in_range(0.0));
        assert!(!quantity_in_range(-1.0));
        assert!(!quantity_in_range(MAX_QUANTITY + 1.0));
        assert!(!quantity_in_range(f64::NAN));
    }

    #[test]
    fn test_fractions_and_mixed_numbers() {
        assert!(approx(parse("1/2 tsp salt").quantity, 0.5));
        let p = parse("1 1/2 cups sugar");
        assert!(approx(p.quantity, 1.5));
        assert_eq!(p.unit, Some(MeasurementUnit::Cup));
        assert_eq!(p.name, "sugar");
    }

    #[test]
    fn test_unicode_fractions() {
        assert!(approx(parse("½ cup cream").quantity, 0.5));
        assert!(approx(parse("1½ cups rice").quantity, 1.5));
        assert!(approx(parse("2 ¾ cups stock").quantity, 2.75));
    }

    #[test]
    fn test_ranges_take_upper_bound() {
        assert_eq!(parse("2-3 cloves garlic").quantity, Some(3.0));
        let p = parse("4 to 6 slices bread");
        assert_eq!(p.quantity, Some(6.0));
        assert_eq!(p.unit, Some(MeasurementUnit::Slice));
        assert_eq!(p.name, "bread");
    }

    #[test]
    fn test_of_and_notes() {
        let p = parse("2 cups of flour, sifted");
        assert_eq!(p.name, "flour");
        assert_eq!(p.note.as_deref(), Some("sifted"));

        let p = parse("1 can tomatoes (drained)");
        assert_eq!(p.unit, Some(MeasurementUnit::Can));
        assert_eq!(p.name, "tomatoes");
        assert_eq!(p.note.as_deref(), Some("drained"));
    }

    #[test]
    fn test_no_unit() {
        let p = parse("2 large eggs");
        assert_eq!(p.quantity, Some(2.0));
        assert_eq!(p.unit, None);
        assert_eq!(p.name, "large eggs");
    }

    #[test]
    fn test_two_word_unit() {
        let p = parse("8 fl oz orange juice");
        assert_eq!(p.unit, Some(MeasurementUnit::FlOz));
        assert_eq!(p.name, "orange juice");
    }

    #[test]
    fn test_unit_word_alone_is_the_name() {
        let p = parse("2 cans");
        assert_eq!(p.unit, None);
        assert_eq!(p.name, "cans");
    }

    #[test]
    fn test_line_without_quantity_keeps_whole_text() {
        let p = parse("Salt and pepper, to taste");
        assert_eq!(p.quantity, None);
        assert_eq!(p.unit, None);
        assert_eq!(p.name, "Salt and pepper, to taste");
        assert_eq!(p.note, None);
    }

    #[test]
    fn test_markup_and_empty_lines() {
        assert_eq!(parse("<b>1</b> cup milk").name, "milk");
        assert!(parse_ingredient_line("   ").is_none());
        assert!(parse_ingredient_line("<span></span>").is_none());
    }

    #[test]
    fn test_zero_quantity_dropped() {
        let p = parse("0 g sugar");
        assert_eq!(p.quantity, None);
        assert_eq!(p.unit, Some(MeasurementUnit::G));
    }

    #[test]
    fn test_into_ingredient_input() {
        let input: IngredientInput = parse("1 lb beef").into();
        assert_eq!(input.unit, Some(MeasurementUnit::Lb));
        assert_eq!(input.category, None);
    }
}
