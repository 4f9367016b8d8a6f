use crate::error::ImportError;
use crate::types::Row;
use serde_json::Value;
use tracing::instrument;

/// Turns a parsed JSON document into a flat, ordered sequence of rows
pub struct RecordNormalizer {
    wrapper_field: String,
}

impl RecordNormalizer {
    pub fn new(wrapper_field: impl Into<String>) -> Self {
        RecordNormalizer {
            wrapper_field: wrapper_field.into(),
        }
    }

    /// Normalize a document into rows.
    ///
    /// A bare value is treated as a one-element array. When every element is an
    /// object carrying an array under the wrapper field, those arrays are
    /// concatenated in order (one level only).
    #[instrument(name = "normalize", skip_all)]
    pub fn normalize(&self, document: Value) -> Result<Vec<Row>, ImportError> {
        let elements = match document {
            Value::Array(arr) => arr,
            other => vec![other],
        };

        if elements.is_empty() {
            return Err(ImportError::EmptyInput { after_flatten: false });
        }

        let elements = if self.is_wrapper_array(&elements) {
            let wrappers = elements.len();
            let flattened = self.flatten_wrappers(elements);
            tracing::info!(
                wrappers,
                records = flattened.len(),
                field = %self.wrapper_field,
                "Flattened wrapped records"
            );
            if flattened.is_empty() {
                return Err(ImportError::EmptyInput { after_flatten: true });
            }
            flattened
        } else {
            elements
        };

        let rows = elements
            .into_iter()
            .enumerate()
            .map(|(index, value)| match value {
                Value::Object(obj) => Ok(obj),
                _ => Err(ImportError::RecordNotObject { index }),
            })
            .collect::<Result<Vec<Row>, _>>()?;

        tracing::debug!(rows = rows.len(), "Normalized document");
        Ok(rows)
    }

    /// Every element must be an object whose wrapper field is an array
    fn is_wrapper_array(&self, elements: &[Value]) -> bool {
        elements.iter().all(|item| {
            item.as_object()
                .and_then(|obj| obj.get(&self.wrapper_field))
                .is_some_and(Value::is_array)
        })
    }

    fn flatten_wrappers(&self, elements: Vec<Value>) -> Vec<Value> {
        elements
            .into_iter()
            .flat_map(|item| match item {
                Value::Object(mut obj) => match obj.remove(&self.wrapper_field) {
                    Some(Value::Array(records)) => records,
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            })
            .collect()
    }
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new("records")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: Value) -> Vec<Value> {
        RecordNormalizer::default()
            .normalize(value)
            .unwrap()
            .into_iter()
            .map(Value::Object)
            .collect()
    }

    #[test]
    fn test_bare_object_is_wrapped() {
        assert_eq!(rows(json!({"a": 1})), vec![json!({"a": 1})]);
    }

    #[test]
    fn test_array_order_preserved() {
        let input = json!([{"a": 1}, {"b": 2}, {"a": 3}]);
        assert_eq!(rows(input), vec![json!({"a": 1}), json!({"b": 2}), json!({"a": 3})]);
    }

    #[test]
    fn test_wrapper_flattening() {
        let input = json!([
            {"records": [{"a": 1}]},
            {"records": [{"a": 2}, {"a": 3}]}
        ]);
        assert_eq!(rows(input), vec![json!({"a": 1}), json!({"a": 2}), json!({"a": 3})]);
    }

    #[test]
    fn test_single_wrapper_object() {
        let input = json!({"page": 1, "records": [{"a": 1}, {"a": 2}]});
        assert_eq!(rows(input), vec![json!({"a": 1}), json!({"a": 2})]);
    }

    #[test]
    fn test_flattens_one_level_only() {
        let input = json!([{"records": [{"records": [{"a": 1}]}]}]);
        assert_eq!(rows(input), vec![json!({"records": [{"a": 1}]})]);
    }

    #[test]
    fn test_partial_wrapper_is_not_flattened() {
        let input = json!([
            {"records": [{"a": 1}]},
            {"records": "not an array"}
        ]);
        assert_eq!(
            rows(input),
            vec![json!({"records": [{"a": 1}]}), json!({"records": "not an array"})]
        );
    }

    #[test]
    fn test_null_element_disables_flattening() {
        let normalizer = RecordNormalizer::default();
        let err = normalizer
            .normalize(json!([{"records": [{"a": 1}]}, null]))
            .unwrap_err();
        assert!(matches!(err, ImportError::RecordNotObject { index: 1 }));
    }

    #[test]
    fn test_empty_array_rejected() {
        let err = RecordNormalizer::default().normalize(json!([])).unwrap_err();
        assert!(matches!(err, ImportError::EmptyInput { after_flatten: false }));
    }

    #[test]
    fn test_empty_after_flattening_rejected() {
        let err = RecordNormalizer::default()
            .normalize(json!([{"records": []}, {"records": []}]))
            .unwrap_err();
        assert!(matches!(err, ImportError::EmptyInput { after_flatten: true }));
    }

    #[test]
    fn test_scalar_records_rejected() {
        let err = RecordNormalizer::default().normalize(json!([{"a": 1}, 2])).unwrap_err();
        assert!(matches!(err, ImportError::RecordNotObject { index: 1 }));
    }

    #[test]
    fn test_custom_wrapper_field() {
        let normalizer = RecordNormalizer::new("items");
        let out = normalizer.normalize(json!([{"items": [{"x": true}]}])).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["x"], json!(true));
    }
}
