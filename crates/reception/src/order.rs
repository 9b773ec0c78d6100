//! The order-line grammar: semicolon-separated `<type> <SIZE> x<quantity>`
//! triples, validated against a fixed regex before tokenizing.

use std::sync::OnceLock;

use regex::Regex;

use plazza_protocol::{ParseError, PizzaSize, PizzaType};

/// One parsed `<type> <SIZE> x<quantity>` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderItem {
    /// Which pizza.
    pub pizza_type: PizzaType,
    /// Which size.
    pub size: PizzaSize,
    /// How many, in `1..=99`.
    pub quantity: u32,
}

fn line_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z]+\s+(S|M|L|XL|XXL)\s+x[1-9][0-9]*(\s*;\s*[a-zA-Z]+\s+(S|M|L|XL|XXL)\s+x[1-9][0-9]*)*$",
        )
        .expect("order line pattern is a valid regex")
    })
}

fn item_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([a-zA-Z]+)\s+(S|M|L|XL|XXL)\s+x([1-9][0-9]*)$")
            .expect("order item pattern is a valid regex")
    })
}

/// Truncate `line` at its first `#`, the comment marker.
pub fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Parse one order line into its constituent items.
///
/// The whole line is checked against the grammar before any clause is
/// tokenized, so a malformed line never partially dispatches.
pub fn parse_order_line(line: &str) -> Result<Vec<OrderItem>, ParseError> {
    let trimmed = strip_comment(line).trim();

    if !line_pattern().is_match(trimmed) {
        return Err(ParseError::new(
            line,
            "expected '<type> <SIZE> x<quantity>[; <type> <SIZE> x<quantity>]...', \
             e.g. 'margarita M x2; regina L x1' (types: margarita, regina, americana, \
             fantasia; sizes: S, M, L, XL, XXL; quantity: 1-99)",
        ));
    }

    trimmed.split(';').map(|clause| parse_item(line, clause.trim())).collect()
}

fn parse_item(original_line: &str, clause: &str) -> Result<OrderItem, ParseError> {
    let captures = item_pattern()
        .captures(clause)
        .ok_or_else(|| ParseError::new(original_line, format!("malformed order item {clause:?}")))?;

    let pizza_type = PizzaType::from_name(&captures[1])
        .ok_or_else(|| ParseError::new(original_line, format!("unknown pizza type {:?}", &captures[1])))?;
    let size = PizzaSize::from_name(&captures[2])
        .ok_or_else(|| ParseError::new(original_line, format!("unknown size {:?}", &captures[2])))?;
    let quantity: u32 = captures[3]
        .parse()
        .map_err(|_| ParseError::new(original_line, format!("invalid quantity {:?}", &captures[3])))?;

    if !(1..=99).contains(&quantity) {
        return Err(ParseError::new(
            original_line,
            format!("quantity {quantity} is out of range (must be 1-99)"),
        ));
    }

    Ok(OrderItem { pizza_type, size, quantity })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_single_item() {
        let items = parse_order_line("margarita S x1").unwrap();
        assert_eq!(items, vec![OrderItem { pizza_type: PizzaType::Margarita, size: PizzaSize::S, quantity: 1 }]);
    }

    #[test]
    fn accepts_multiple_items_and_is_case_insensitive_on_type() {
        let items = parse_order_line("Regina XXL x5; AMERICANA M x2").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].pizza_type, PizzaType::Regina);
        assert_eq!(items[1].pizza_type, PizzaType::Americana);
    }

    #[test]
    fn rejects_unknown_pizza_type() {
        assert!(parse_order_line("abcd XXL x1").is_err());
    }

    #[test]
    fn rejects_lowercase_size() {
        assert!(parse_order_line("margarita s x1").is_err());
    }

    #[test]
    fn rejects_quantity_zero_and_over_99() {
        assert!(parse_order_line("margarita S x0").is_err());
        assert!(parse_order_line("margarita S x100").is_err());
    }

    #[test]
    fn accepts_quantity_99() {
        assert!(parse_order_line("margarita S x99").is_ok());
    }

    #[test]
    fn truncates_at_comment_marker() {
        let items = parse_order_line("margarita S x1 # extra cheese please").unwrap();
        assert_eq!(items.len(), 1);
    }
}
