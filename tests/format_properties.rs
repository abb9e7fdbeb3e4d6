//! Property-based tests for value formatting
//!
//! These tests verify that formatted literals behave as SQL values:
//! - BOOL follows value truthiness
//! - TEXT literals read back unchanged through SQLite
//! - DATE and DATETIME literals have a fixed shape

#[cfg(feature = "sqlite")]
mod tests {
    use dbadapter::drivers::SqliteDriver;
    use dbadapter::{Driver, DriverConfig, DriverError, FormattedValue, SemanticType, Value};
    use proptest::prelude::*;

    fn connected_driver() -> SqliteDriver {
        let mut driver = SqliteDriver::new();
        driver
            .connect(&DriverConfig::from_dsn("sqlite::memory:"))
            .unwrap();
        driver
    }

    fn is_date_literal(s: &str) -> bool {
        let bytes = s.as_bytes();
        bytes.len() == 12
            && bytes[0] == b'\''
            && bytes[11] == b'\''
            && bytes[5] == b'-'
            && bytes[8] == b'-'
            && [1, 2, 3, 4, 6, 7, 9, 10]
                .iter()
                .all(|&i| bytes[i].is_ascii_digit())
    }

    proptest! {
        #[test]
        fn bool_follows_integer_truthiness(n in any::<i64>()) {
            let driver = SqliteDriver::new();
            let formatted = driver.format(&Value::Integer(n), SemanticType::Bool).unwrap();
            prop_assert_eq!(formatted, FormattedValue::Integer(if n != 0 { 1 } else { 0 }));
        }

        #[test]
        fn bool_follows_text_truthiness(s in "[0-9a-z]{0,3}") {
            let driver = SqliteDriver::new();
            let expected = if s.is_empty() || s == "0" { 0 } else { 1 };
            let formatted = driver.format(&Value::Text(s), SemanticType::Bool).unwrap();
            prop_assert_eq!(formatted, FormattedValue::Integer(expected));
        }

        #[test]
        fn text_literal_reads_back_unchanged(
            s in prop::collection::vec(any::<char>(), 0..48)
                .prop_map(|chars| chars.into_iter().collect::<String>())
        ) {
            let mut driver = connected_driver();
            let formatted = driver.format(&Value::Text(s.clone()), SemanticType::Text);
            if s.contains('\0') {
                prop_assert!(matches!(formatted, Err(DriverError::InvalidArgument(_))));
                return Ok(());
            }
            let literal = formatted.unwrap();

            prop_assert!(driver.query(&format!("SELECT {} AS v", literal)).unwrap());
            let row = driver.fetch().unwrap().unwrap();
            let expected = Value::Text(s);
            prop_assert_eq!(row.get("v"), Some(&expected));
        }

        #[test]
        fn date_literals_have_fixed_shape(secs in 0i64..4_102_444_800) {
            let driver = SqliteDriver::new();
            let date = driver.format(&Value::Integer(secs), SemanticType::Date).unwrap().to_string();
            let datetime = driver.format(&Value::Integer(secs), SemanticType::DateTime).unwrap().to_string();

            prop_assert!(is_date_literal(&date), "unexpected date literal {}", date);
            prop_assert_eq!(datetime.len(), 21);
            prop_assert_eq!(&datetime[..11], &date[..11]);
            prop_assert!(datetime.ends_with('\''));
        }
    }

    #[test]
    fn text_with_nul_is_rejected() {
        let driver = SqliteDriver::new();
        assert!(matches!(
            driver.format(&Value::from("a\0b"), SemanticType::Text),
            Err(DriverError::InvalidArgument(_))
        ));
    }

    #[test]
    fn date_of_epoch() {
        let driver = SqliteDriver::new();
        assert_eq!(
            driver.format(&Value::Integer(0), SemanticType::Date).unwrap().to_string(),
            "'1970-01-01'"
        );
    }
}
