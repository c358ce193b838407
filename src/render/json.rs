use crate::correlator::Emission;
use crate::params::parse_params;
use serde_json::Value;

/// Converts an emission to a JSON value.
///
/// Records whose parameter payload parses gain a structured `params` field
/// next to `raw_params`.
pub fn emission_to_json(emission: &Emission) -> serde_json::Result<Value> {
    let mut value = serde_json::to_value(emission)?;
    if let Emission::Record(view) = emission {
        let parsed = view.raw_params.as_deref().and_then(|raw| parse_params(raw).ok());
        if let (Some(parsed), Value::Object(map)) = (parsed, &mut value) {
            map.insert("params".to_string(), parsed);
        }
    }
    Ok(value)
}

/// One compact JSON object, suitable for line-delimited output.
pub fn format_emission_json(emission: &Emission) -> serde_json::Result<String> {
    serde_json::to_string(&emission_to_json(emission)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlator::RequestCorrelator;

    #[test]
    fn test_record_json_has_type_and_params() {
        let mut correlator = RequestCorrelator::default();
        let emissions = correlator.process_lines([
            r#"[r1] Started POST "/login" for 127.0.0.1"#,
            r#"[r1] Parameters: {"email"=>"a@b.c", "remember"=>"1"}"#,
            "[r1] Completed 302 Found in 3ms",
        ]);
        assert_eq!(emissions.len(), 1);

        let value = emission_to_json(&emissions[0]).expect("json");
        assert_eq!(value["type"], "record");
        assert_eq!(value["path"], "/login");
        assert_eq!(value["status"], 302);
        assert_eq!(value["params"]["email"], "a@b.c");
        assert_eq!(value["kept"], false);
    }

    #[test]
    fn test_json_is_single_line() {
        let mut correlator = RequestCorrelator::default();
        let emissions = correlator.process_lines([
            r#"[r1] Started GET "/" for 127.0.0.1"#,
            "[r1] Completed 200 OK in 1ms",
        ]);
        let line = format_emission_json(&emissions[0]).expect("json");
        assert!(!line.contains('\n'));
        assert!(line.starts_with(r#"{"type":"record""#));
    }
}
