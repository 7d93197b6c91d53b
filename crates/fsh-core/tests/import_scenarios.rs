//! End-to-end scenarios exercising the full import pipeline: parse,
//! preprocess, resolve, visit.

use fsh_core::{import, DefRecord, DefinitionProvider, DocumentIr, EmptyDefinitionProvider, ImportConfig, RawInput};
use fsh_core::ir::{Rule, ValueSetComponent};

fn run(sources: &[(&str, &str)], canonical: &str) -> (Vec<DocumentIr>, Vec<fsh_core::Diagnostic>) {
    let inputs: Vec<RawInput> = sources.iter().map(|(path, content)| RawInput::new(*path, *content)).collect();
    let config = ImportConfig::new(canonical);
    let defs = EmptyDefinitionProvider;
    import(&inputs, &config, &defs)
}

#[test]
fn profile_with_card_flag_and_binding_is_fully_resolved() {
    let src = "Profile: VitalSign\nParent: Observation\nId: vital-sign\nTitle: \"Vital Sign\"\n\
               * status 1..1 MS\n* code from VSCodes\n";
    let vs = "ValueSet: VSCodes\nId: vs-codes\n* http://example.org/CodeSystem/demo#a\n* http://example.org/CodeSystem/demo#b\n";
    let (docs, diags) = run(&[("profile.fsh", src), ("valueset.fsh", vs)], "http://example.org");
    assert!(diags.is_empty(), "{diags:?}");

    let profile = &docs[0].profiles["VitalSign"];
    assert_eq!(profile.parent, "Observation");
    assert_eq!(profile.id, "vital-sign");
    assert_eq!(profile.title.as_deref(), Some("Vital Sign"));
    assert_eq!(profile.rules.len(), 3); // card, synthesized flag, valueset

    match &profile.rules[2] {
        Rule::ValueSet(rule) => {
            assert_eq!(rule.value_set, "http://example.org/ValueSet/vs-codes");
        }
        other => panic!("expected value set rule, got {other:?}"),
    }
}

#[test]
fn extension_contains_synthesizes_slice_rules() {
    let src = "Extension: ComplexExtension\n* extension contains part1 0..1 MS and part2 0..* SU\n";
    let (docs, diags) = run(&[("ext.fsh", src)], "http://example.org");
    assert!(diags.is_empty(), "{diags:?}");
    let ext = &docs[0].extensions["ComplexExtension"];

    let has_slice = |path: &str| ext.rules.iter().any(|r| matches!(r, Rule::Card(c) if c.path == path));
    assert!(has_slice("extension[part1]"));
    assert!(has_slice("extension[part2]"));

    match ext.rules.iter().find(|r| matches!(r, Rule::Contains(_))).unwrap() {
        Rule::Contains(c) => assert_eq!(c.items, vec!["part1".to_string(), "part2".to_string()]),
        _ => unreachable!(),
    }

    // spec I6: the ContainsRule comes first, immediately followed by the
    // per-item rules it sprouts, both MS (card+flag) and SU (card+flag).
    assert!(matches!(ext.rules[0], Rule::Contains(_)));
    assert!(matches!(&ext.rules[1], Rule::Card(c) if c.path == "extension[part1]"));
    assert!(matches!(&ext.rules[2], Rule::Flag(f) if f.path == "extension[part1]"));
    assert!(matches!(&ext.rules[3], Rule::Card(c) if c.path == "extension[part2]"));
    assert!(matches!(&ext.rules[4], Rule::Flag(f) if f.path == "extension[part2]"));
}

#[test]
fn fixed_value_accepts_multiline_string() {
    let src = "Profile: Documented\n* note = \"\"\"\n  line one\n  line two\n  \"\"\"\n";
    let (docs, diags) = run(&[("note.fsh", src)], "http://example.org");
    assert!(diags.is_empty(), "{diags:?}");
    let profile = &docs[0].profiles["Documented"];
    match &profile.rules[0] {
        Rule::FixedValue(rule) => match &rule.value {
            fsh_core::ir::LiteralValue::MultilineString(s) => assert_eq!(s, "line one\nline two"),
            other => panic!("expected multiline string literal, got {other:?}"),
        },
        other => panic!("expected fixed value rule, got {other:?}"),
    }
}

#[test]
fn value_set_mixes_include_and_exclude_components() {
    let src = "ValueSet: MixedSet\n* http://s#keep\n* exclude http://s#drop\n";
    let (docs, diags) = run(&[("vs.fsh", src)], "http://example.org");
    assert!(diags.is_empty(), "{diags:?}");
    let vs = &docs[0].value_sets["MixedSet"];
    assert_eq!(vs.components.len(), 2);

    let included = vs.components.iter().find_map(|c| match c {
        ValueSetComponent::Concept(c) if c.inclusion => Some(c),
        _ => None,
    });
    let excluded = vs.components.iter().find_map(|c| match c {
        ValueSetComponent::Concept(c) if !c.inclusion => Some(c),
        _ => None,
    });
    assert_eq!(included.unwrap().concepts[0].code, "keep");
    assert_eq!(excluded.unwrap().concepts[0].code, "drop");
}

#[test]
fn value_set_filter_component_with_operator() {
    let src = "ValueSet: FilteredSet\n* codes from system http://s where concept is-a #root\n";
    let (docs, diags) = run(&[("vs.fsh", src)], "http://example.org");
    assert!(diags.is_empty(), "{diags:?}");
    let vs = &docs[0].value_sets["FilteredSet"];
    match &vs.components[0] {
        ValueSetComponent::Filter(f) => {
            assert_eq!(f.filters.len(), 1);
            assert_eq!(f.filters[0].property, "concept");
        }
        other => panic!("expected filter component, got {other:?}"),
    }
}

#[test]
fn fixed_value_quantity_and_ratio_literals() {
    let src = "Profile: Dosage\n* value = 5 'mg'\n* ratio = 1:2\n";
    let (docs, diags) = run(&[("dosage.fsh", src)], "http://example.org");
    assert!(diags.is_empty(), "{diags:?}");
    let profile = &docs[0].profiles["Dosage"];

    match &profile.rules[0] {
        Rule::FixedValue(rule) => match &rule.value {
            fsh_core::ir::LiteralValue::Quantity(q) => {
                assert_eq!(q.value, 5.0);
                assert_eq!(q.unit.as_ref().unwrap().code, "mg");
            }
            other => panic!("expected quantity, got {other:?}"),
        },
        other => panic!("expected fixed value rule, got {other:?}"),
    }

    match &profile.rules[1] {
        Rule::FixedValue(rule) => match &rule.value {
            fsh_core::ir::LiteralValue::Ratio(r) => {
                assert_eq!(r.numerator.value, 1.0);
                assert_eq!(r.denominator.value, 2.0);
            }
            other => panic!("expected ratio, got {other:?}"),
        },
        other => panic!("expected fixed value rule, got {other:?}"),
    }
}

#[test]
fn multiline_description_is_dedented() {
    let src = "Profile: Documented\nDescription: \"\"\"\n  line one\n  line two\n  \"\"\"\n";
    let (docs, diags) = run(&[("doc.fsh", src)], "http://example.org");
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(docs[0].profiles["Documented"].description.as_deref(), Some("line one\nline two"));
}

#[test]
fn definition_provider_supplies_external_parent() {
    struct Provider;
    impl DefinitionProvider for Provider {
        fn find(&self, _s: &str) -> Option<DefRecord> {
            None
        }
        fn find_resource(&self, symbol: &str) -> Option<DefRecord> {
            (symbol == "Patient").then(|| DefRecord::new("http://hl7.org/fhir/StructureDefinition/Patient"))
        }
        fn find_type(&self, _s: &str) -> Option<DefRecord> {
            None
        }
        fn find_profile(&self, _s: &str) -> Option<DefRecord> {
            None
        }
        fn find_extension(&self, _s: &str) -> Option<DefRecord> {
            None
        }
        fn find_value_set(&self, _s: &str) -> Option<DefRecord> {
            None
        }
        fn find_code_system(&self, _s: &str) -> Option<DefRecord> {
            None
        }
    }

    let inputs = vec![RawInput::new("profile.fsh", "Profile: MyPatient\nParent: Patient\n")];
    let config = ImportConfig::new("http://example.org");
    let defs = Provider;
    let (docs, diags) = import(&inputs, &config, &defs);
    assert!(diags.is_empty(), "{diags:?}");
    assert_eq!(docs[0].profiles["MyPatient"].parent, "http://hl7.org/fhir/StructureDefinition/Patient");
}

#[test]
fn duplicate_entity_name_in_same_document_keeps_first_and_warns() {
    let src = "Profile: Dup\nTitle: \"first\"\nProfile: Dup\nTitle: \"second\"\n";
    let (docs, diags) = run(&[("dup.fsh", src)], "http://example.org");
    assert_eq!(docs[0].profiles["Dup"].title.as_deref(), Some("first"));
    assert!(diags.iter().any(|d| d.message.contains("duplicate Profile")));
}

#[test]
fn conflicting_cross_document_registration_reports_error() {
    let a = "Profile: Shared\nId: shared-a\n";
    let b = "Profile: Shared\nId: shared-b\n";
    let (_, diags) = run(&[("a.fsh", a), ("b.fsh", b)], "http://example.org");
    assert!(diags.iter().any(|d| d.level == fsh_core::Severity::Error && d.message.contains("already registered")));
}
