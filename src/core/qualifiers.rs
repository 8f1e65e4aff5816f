use crate::domain::model::{lenient, Qualifier};
use serde_json::Value;

pub fn has(qs: &[Qualifier], name: &str) -> bool {
    qs.iter().any(|q| q.name() == Some(name))
}

pub fn has_any(qs: &[Qualifier], names: &[&str]) -> bool {
    qs.iter()
        .any(|q| q.name().is_some_and(|n| names.contains(&n)))
}

/// Value of the first qualifier called `name`. A matching qualifier without a
/// value still ends the search.
pub fn get<'a>(qs: &'a [Qualifier], name: &str) -> Option<&'a Value> {
    qs.iter()
        .find(|q| q.name() == Some(name))
        .and_then(|q| q.value.as_ref())
        .filter(|v| !v.is_null())
}

/// Value of the first qualifier whose name is in `names`.
pub fn get_any<'a>(qs: &'a [Qualifier], names: &[&str]) -> Option<&'a Value> {
    qs.iter()
        .find(|q| q.name().is_some_and(|n| names.contains(&n)))
        .and_then(|q| q.value.as_ref())
        .filter(|v| !v.is_null())
}

pub fn get_f64(qs: &[Qualifier], name: &str) -> Option<f64> {
    get(qs, name).and_then(lenient::value_to_f64)
}

pub fn get_any_i64(qs: &[Qualifier], names: &[&str]) -> Option<i64> {
    get_any(qs, names).and_then(lenient::value_to_i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Labelled;
    use serde_json::json;

    fn q(name: &str, value: Option<Value>) -> Qualifier {
        Qualifier {
            kind: Labelled {
                value: None,
                display_name: Some(name.to_string()),
            },
            value,
        }
    }

    #[test]
    fn test_lookups() {
        let qs = vec![
            q("Length", Some(json!("12.4"))),
            q("KeyPass", None),
            q("Assist", Some(json!("17"))),
        ];
        assert!(has(&qs, "KeyPass"));
        assert!(!has(&qs, "Cross"));
        assert_eq!(get_f64(&qs, "Length"), Some(12.4));
        assert_eq!(get(&qs, "KeyPass"), None);
        // KeyPass matches first and carries no value.
        assert_eq!(get_any_i64(&qs, &["KeyPass", "Assist"]), None);
        assert_eq!(get_any_i64(&qs, &["Assist", "GoalAssist"]), Some(17));
        assert!(has_any(&qs, &["GoalAssist", "Assist"]));
    }
}
