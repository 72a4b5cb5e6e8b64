//! Seed file parsing.
//!
//! A seed file holds one `name,quantity,price` row per line. Blank lines are
//! skipped; everything after the second comma belongs to the price.

use crate::error::{Result, ServiceError};

use super::Meal;

/// Parse the contents of a seed file.
pub fn parse_seed(contents: &str) -> Result<Vec<Meal>> {
    let mut meals = Vec::new();

    for (index, line) in contents.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.splitn(3, ',');
        let (Some(name), Some(quantity), Some(price)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(ServiceError::Seed(format!(
                "line {}: expected name,quantity,price",
                index + 1
            )));
        };

        let quantity = quantity.trim().parse::<i64>().map_err(|e| {
            ServiceError::Seed(format!("line {}: bad quantity {:?}: {}", index + 1, quantity, e))
        })?;

        meals.push(Meal::new(name, quantity, price));
    }

    Ok(meals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows() {
        let meals = parse_seed("Burger,2,8.50\nPizza,1,12.00\n").unwrap();
        assert_eq!(
            meals,
            vec![Meal::new("Burger", 2, "8.50"), Meal::new("Pizza", 1, "12.00")]
        );
    }

    #[test]
    fn test_skips_blank_lines_and_crlf() {
        let meals = parse_seed("Soup,4,3.25\r\n\r\n\nSalad,0,6\r\n").unwrap();
        assert_eq!(meals.len(), 2);
        assert_eq!(meals[0].price, "3.25");
        assert_eq!(meals[1].name, "Salad");
    }

    #[test]
    fn test_missing_fields_rejected() {
        let err = parse_seed("Soup,4\n").unwrap_err();
        assert!(matches!(err, ServiceError::Seed(msg) if msg.starts_with("line 1")));
    }

    #[test]
    fn test_bad_quantity_rejected() {
        let err = parse_seed("Soup,4,1\nTea,many,2\n").unwrap_err();
        assert!(matches!(err, ServiceError::Seed(msg) if msg.starts_with("line 2")));
    }
}
