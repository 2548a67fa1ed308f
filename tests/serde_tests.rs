#[cfg(feature = "serde")]
mod serde_tests {
    use callrec_template::{
        ArgumentRule, DateFormatter, OffsetFallback, ParseError, ParseErrorKind, Template,
        TemplateError, VariableRegistry, VariableSpec, parse,
    };

    #[test]
    #[ntest::timeout(100)]
    fn test_registry_from_json_config() {
        let config = r#"{
            "date": { "argument": { "type": "date_format" } },
            "direction": { "argument": { "type": "none" } },
            "phone_number": { "argument": { "type": "one_of", "values": ["digits_only"] } }
        }"#;
        let registry: VariableRegistry = serde_json::from_str(config).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.get("phone_number"),
            Some(&VariableSpec::new(ArgumentRule::OneOf(vec![
                "digits_only".to_string()
            ])))
        );
        let errors = registry.validate(&parse("{date:%Y}{direction}{phone_number:E.164}").unwrap());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].var_ref().name, "phone_number");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_registry_round_trip() {
        let registry = VariableRegistry::call_recording();
        let serialized = serde_json::to_string(&registry).unwrap();
        let deserialized: VariableRegistry = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, registry);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_template_serialization() {
        let template = Template::new("{date}[_{direction}|]").unwrap();
        let serialized = serde_json::to_string(&template).unwrap();
        assert_eq!(serialized, r#"{"source":"{date}[_{direction}|]"}"#);

        let deserialized: Template = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, template);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_invalid_template_rejected_on_deserialize() {
        let result: Result<Template, _> = serde_json::from_str(r#"{"source":"{date"}"#);
        assert!(result.is_err());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_error_serialization() {
        let err = TemplateError::Parse(ParseError::new(ParseErrorKind::TrailingInput, 3));
        let serialized = serde_json::to_string(&err).unwrap();
        let deserialized: TemplateError = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, err);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_date_formatter_from_config() {
        let formatter: DateFormatter =
            serde_json::from_str(r#"{"pattern":"%Y-%m-%d","offset_fallback":{"Fixed":3600}}"#)
                .unwrap();
        assert_eq!(formatter.pattern(), "%Y-%m-%d");
        assert_eq!(formatter.offset_fallback(), OffsetFallback::Fixed(3600));

        let formatter: DateFormatter = serde_json::from_str(r#"{"pattern":"%H%M"}"#).unwrap();
        assert_eq!(formatter.offset_fallback(), OffsetFallback::Local);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_invalid_date_pattern_rejected_on_deserialize() {
        for config in [r#"{"pattern":"%Y-%Q"}"#, r#"{"pattern":""}"#] {
            let result: Result<DateFormatter, _> = serde_json::from_str(config);
            assert!(result.is_err(), "config: {config}");
        }
    }
}
