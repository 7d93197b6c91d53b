//! Pass 2: walk the parse tree and build the typed, location-annotated IR
//! (spec §4.4, §4.5, §4.5bis).

use indexmap::IndexMap;
use pest::iterators::Pair;

use crate::diagnostic::{Diagnostic, DiagnosticSink};
use crate::ir::{
    BindingStrength, CardRule, CaretValueRule, Code, ConceptComponent, ContainsRule, DocumentIr, EntityKind,
    FilterComponent, FixedValueRule, FlagRule, FromSpec, Instance, LiteralValue, OnlyRule, OnlyType, Quantity, Ratio,
    Reference, Rule as IrRule, SourceInfo, StructureDef, UCUM_SYSTEM, ValueSet, ValueSetComponent, ValueSetRule,
    VsFilter, VsFilterValue, VsOperator,
};
use crate::location::{location_from_pair, TextLocation};
use crate::parser::Rule;
use crate::resolver::Resolver;
use crate::string_lit::{dedent_multiline, unescape_single_line};

const PARENT_KINDS: &[EntityKind] = &[
    EntityKind::Alias,
    EntityKind::Profile,
    EntityKind::Extension,
    EntityKind::Resource,
    EntityKind::Type,
];
const VALUE_SET_KINDS: &[EntityKind] = &[EntityKind::Alias, EntityKind::ValueSet];
const CODE_SYSTEM_KINDS: &[EntityKind] = &[EntityKind::Alias, EntityKind::CodeSystem];
const INSTANCE_OF_KINDS: &[EntityKind] = PARENT_KINDS;
const REFERENCE_TARGET_KINDS: &[EntityKind] = PARENT_KINDS;

/// Walk one document's parse tree into a [`DocumentIr`].
#[tracing::instrument(skip_all, fields(file))]
pub fn visit_document(
    pairs: pest::iterators::Pairs<'_, Rule>,
    file: Option<String>,
    resolver: &Resolver<'_>,
    diagnostics: &mut dyn DiagnosticSink,
) -> DocumentIr {
    let mut doc = DocumentIr::new(file.clone());

    for entity in pairs {
        if entity.as_rule() != Rule::entity {
            continue;
        }
        let Some(inner) = entity.into_inner().next() else { continue };
        match inner.as_rule() {
            Rule::alias => visit_alias(inner, &mut doc),
            Rule::profile => {
                let sd = visit_structure_def(inner, EntityKind::Profile, "Resource", file.as_deref(), resolver, diagnostics);
                insert_unique(&mut doc.profiles, sd.name.clone(), sd, "Profile", file.as_deref(), diagnostics);
            }
            Rule::extension => {
                let sd = visit_structure_def(inner, EntityKind::Extension, "Extension", file.as_deref(), resolver, diagnostics);
                insert_unique(&mut doc.extensions, sd.name.clone(), sd, "Extension", file.as_deref(), diagnostics);
            }
            Rule::instance => {
                if let Some(instance) = visit_instance(inner, file.as_deref(), resolver, diagnostics) {
                    insert_unique(&mut doc.instances, instance.name.clone(), instance, "Instance", file.as_deref(), diagnostics);
                }
            }
            Rule::value_set => {
                let vs = visit_value_set(inner, file.as_deref(), resolver, diagnostics);
                insert_unique(&mut doc.value_sets, vs.name.clone(), vs, "ValueSet", file.as_deref(), diagnostics);
            }
            _ => {}
        }
    }

    doc
}

fn insert_unique<T>(
    map: &mut IndexMap<String, T>,
    name: String,
    value: T,
    kind: &str,
    file: Option<&str>,
    diagnostics: &mut dyn DiagnosticSink,
) {
    if map.contains_key(&name) {
        diagnostics.push(Diagnostic::warn(
            format!("duplicate {kind} '{name}' in the same document; keeping the first declaration"),
            file,
            None,
        ));
        return;
    }
    map.insert(name, value);
}

fn visit_alias(pair: Pair<'_, Rule>, doc: &mut DocumentIr) {
    let mut seqs = pair.into_inner();
    let Some(name) = seqs.next() else { return };
    let Some(url) = seqs.next() else { return };
    doc.aliases.entry(name.as_str().to_owned()).or_insert_with(|| url.as_str().to_owned());
}

/// Tracks which single-valued metadata keys have already been seen on the
/// current entity, and the first value recorded for each, so a repeat can
/// be reported with the prior value instead of silently overwriting it
/// (spec §4.4).
struct SeenKeys(std::collections::HashMap<&'static str, String>);

impl SeenKeys {
    fn new() -> Self {
        Self(std::collections::HashMap::new())
    }

    /// Returns `None` the first time `key` is seen (after recording `value`
    /// as its first value), or `Some(prior_value)` on every repeat.
    fn mark(&mut self, key: &'static str, value: &str) -> Option<String> {
        match self.0.get(key) {
            Some(prior) => Some(prior.clone()),
            None => {
                self.0.insert(key, value.to_owned());
                None
            }
        }
    }
}

fn visit_structure_def(
    pair: Pair<'_, Rule>,
    kind: EntityKind,
    default_parent: &str,
    file: Option<&str>,
    resolver: &Resolver<'_>,
    diagnostics: &mut dyn DiagnosticSink,
) -> StructureDef {
    let location = location_from_pair(&pair);
    let mut inner = pair.into_inner();
    let name_pair = inner.next();
    let name = name_pair.as_ref().map(|p| p.as_str().to_owned()).unwrap_or_default();

    let mut id = None;
    let mut parent = None;
    let mut title = None;
    let mut description = None;
    let mut seen = SeenKeys::new();
    let mut rules = Vec::new();

    for child in inner {
        match child.as_rule() {
            Rule::sd_metadata => {
                let Some(field) = child.into_inner().next() else { continue };
                let field_location = location_from_pair(&field);
                match field.as_rule() {
                    Rule::id_metadata => {
                        let raw = field.into_inner().next().map(|p| p.as_str().to_owned()).unwrap_or_default();
                        match seen.mark("Id", &raw) {
                            None => id = Some(raw),
                            Some(prior) => duplicate_metadata(diagnostics, "Id", &prior, file, field_location),
                        }
                    }
                    Rule::parent_metadata => {
                        let raw = field.into_inner().next().map(|p| p.as_str().to_owned()).unwrap_or_default();
                        match seen.mark("Parent", &raw) {
                            None => parent = Some(resolver.resolve(&raw, PARENT_KINDS)),
                            Some(prior) => duplicate_metadata(diagnostics, "Parent", &prior, file, field_location),
                        }
                    }
                    Rule::title_metadata => {
                        let raw = field.into_inner().next().map(visit_string).unwrap_or_default();
                        match seen.mark("Title", &raw) {
                            None => title = Some(raw),
                            Some(prior) => duplicate_metadata(diagnostics, "Title", &prior, file, field_location),
                        }
                    }
                    Rule::description_metadata => {
                        let raw = field.into_inner().next().map(visit_string_or_multiline).unwrap_or_default();
                        match seen.mark("Description", &raw) {
                            None => description = Some(raw),
                            Some(prior) => duplicate_metadata(diagnostics, "Description", &prior, file, field_location),
                        }
                    }
                    _ => {}
                }
            }
            Rule::sd_rule => visit_sd_rule(child, resolver, &mut rules),
            _ => {}
        }
    }

    StructureDef {
        id: id.unwrap_or_else(|| name.clone()),
        name,
        parent: parent.unwrap_or_else(|| default_parent.to_owned()),
        title,
        description,
        rules,
        source_info: SourceInfo {
            file: file.map(str::to_owned),
            location,
        },
    }
}

/// Report a repeated metadata key on the same entity (spec §4.4, §7): this
/// is an error, the duplicate's location is attached, and the message names
/// the value that was already recorded.
fn duplicate_metadata(diagnostics: &mut dyn DiagnosticSink, key: &str, prior: &str, file: Option<&str>, location: TextLocation) {
    diagnostics.push(Diagnostic::error(
        format!("Metadata field '{key}' already declared with value '{prior}'."),
        file,
        Some(location),
    ));
}

fn visit_sd_rule(pair: Pair<'_, Rule>, resolver: &Resolver<'_>, rules: &mut Vec<IrRule>) {
    let Some(inner) = pair.into_inner().next() else { return };
    match inner.as_rule() {
        Rule::card_rule => visit_card_rule(inner, rules),
        Rule::flag_rule => visit_flag_rule(inner, rules),
        Rule::valueset_rule => rules.push(IrRule::ValueSet(visit_valueset_rule(inner, resolver))),
        Rule::only_rule => rules.push(IrRule::Only(visit_only_rule(inner, resolver))),
        Rule::contains_rule => visit_contains_rule(inner, rules),
        Rule::caret_value_rule => rules.push(IrRule::CaretValue(visit_caret_value_rule(inner, resolver))),
        Rule::fixed_value_rule => rules.push(IrRule::FixedValue(visit_fixed_value_rule(inner, resolver))),
        _ => {}
    }
}

fn visit_card_rule(pair: Pair<'_, Rule>, rules: &mut Vec<IrRule>) {
    let location = location_from_pair(&pair);
    let mut inner = pair.into_inner();
    let Some(path_pair) = inner.next() else { return };
    let path = path_pair.as_str().to_owned();
    let Some(card_pair) = inner.next() else { return };
    let (min, max) = parse_card(card_pair.as_str());
    rules.push(IrRule::Card(CardRule { path: path.clone(), min, max, location }));

    let flags: Vec<Pair<'_, Rule>> = inner.collect();
    if !flags.is_empty() {
        rules.push(IrRule::Flag(flags_to_rule(path, &flags, location)));
    }
}

fn parse_card(text: &str) -> (i64, String) {
    match text.split_once("..") {
        Some((min, max)) => (min.parse().unwrap_or(0), max.to_owned()),
        None => (0, text.to_owned()),
    }
}

fn visit_flag_rule(pair: Pair<'_, Rule>, rules: &mut Vec<IrRule>) {
    let location = location_from_pair(&pair);
    let mut inner = pair.into_inner().peekable();
    let Some(first) = inner.next() else { return };

    let paths: Vec<String> = match first.as_rule() {
        Rule::path_list => first.into_inner().map(|p| p.as_str().to_owned()).collect(),
        Rule::path => vec![first.as_str().to_owned()],
        _ => return,
    };
    let flags: Vec<Pair<'_, Rule>> = inner.collect();
    for path in paths {
        rules.push(IrRule::Flag(flags_to_rule(path, &flags, location)));
    }
}

fn flags_to_rule(path: String, flags: &[Pair<'_, Rule>], location: TextLocation) -> FlagRule {
    let mut rule = FlagRule { path, location, ..Default::default() };
    for flag in flags {
        match flag.as_str() {
            "MS" => rule.must_support = true,
            "SU" => rule.summary = true,
            "?!" => rule.modifier = true,
            _ => {}
        }
    }
    rule
}

fn visit_valueset_rule(pair: Pair<'_, Rule>, resolver: &Resolver<'_>) -> ValueSetRule {
    let location = location_from_pair(&pair);
    let mut inner = pair.into_inner();
    let path = inner.next().map(|p| p.as_str().to_owned()).unwrap_or_default();
    let value_set = inner
        .next()
        .map(|p| resolver.resolve(p.as_str(), VALUE_SET_KINDS))
        .unwrap_or_default();
    let strength = inner
        .next()
        .and_then(|p| BindingStrength::parse(p.as_str()))
        .unwrap_or_default();
    ValueSetRule { path, value_set, strength, location }
}

fn visit_fixed_value_rule(pair: Pair<'_, Rule>, resolver: &Resolver<'_>) -> FixedValueRule {
    let location = location_from_pair(&pair);
    let mut inner = pair.into_inner();
    let path = inner.next().map(|p| p.as_str().to_owned()).unwrap_or_default();
    let value = inner.next().map(|p| visit_value(p, resolver)).unwrap_or(LiteralValue::Boolean(false));
    FixedValueRule { path, value, location }
}

fn visit_only_rule(pair: Pair<'_, Rule>, resolver: &Resolver<'_>) -> OnlyRule {
    let location = location_from_pair(&pair);
    let mut inner = pair.into_inner();
    let path = inner.next().map(|p| p.as_str().to_owned()).unwrap_or_default();
    let mut types = Vec::new();
    for target in inner {
        if target.as_rule() != Rule::only_target {
            continue;
        }
        let Some(choice) = target.into_inner().next() else { continue };
        match choice.as_rule() {
            Rule::reference_literal_type => {
                for seq in choice.into_inner() {
                    types.push(OnlyType {
                        type_url: resolver.resolve(seq.as_str(), REFERENCE_TARGET_KINDS),
                        is_reference: true,
                    });
                }
            }
            Rule::sequence => {
                types.push(OnlyType {
                    type_url: resolver.resolve(choice.as_str(), REFERENCE_TARGET_KINDS),
                    is_reference: false,
                });
            }
            _ => {}
        }
    }
    OnlyRule { path, types, location }
}

fn visit_contains_rule(pair: Pair<'_, Rule>, rules: &mut Vec<IrRule>) {
    let location = location_from_pair(&pair);
    let mut inner = pair.into_inner();
    let Some(path_pair) = inner.next() else { return };
    let path = path_pair.as_str().to_owned();

    let mut items = Vec::new();
    let mut synthesized = Vec::new();
    for item in inner {
        if item.as_rule() != Rule::contains_item {
            continue;
        }
        let item_location = location_from_pair(&item);
        let mut fields = item.into_inner();
        let Some(name_pair) = fields.next() else { continue };
        let name = name_pair.as_str().to_owned();
        let Some(card_pair) = fields.next() else { continue };
        let (min, max) = parse_card(card_pair.as_str());
        let slice_path = format!("{path}[{name}]");

        synthesized.push(IrRule::Card(CardRule { path: slice_path.clone(), min, max, location: item_location }));

        let flags: Vec<Pair<'_, Rule>> = fields.collect();
        if !flags.is_empty() {
            synthesized.push(IrRule::Flag(flags_to_rule(slice_path, &flags, item_location)));
        }

        items.push(name);
    }

    // The ContainsRule itself comes first (spec I6), immediately followed by
    // the per-item rules it sprouts.
    rules.push(IrRule::Contains(ContainsRule { path, items, location }));
    rules.extend(synthesized);
}

fn visit_caret_value_rule(pair: Pair<'_, Rule>, resolver: &Resolver<'_>) -> CaretValueRule {
    let location = location_from_pair(&pair);
    let mut path = String::new();
    let mut caret_path = String::new();
    let mut value = None;
    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::path => path = child.as_str().to_owned(),
            Rule::caret_sequence => caret_path = child.as_str().trim_start_matches('^').to_owned(),
            _ => value = Some(visit_value(child, resolver)),
        }
    }
    CaretValueRule {
        path,
        caret_path,
        value: value.unwrap_or(LiteralValue::Boolean(false)),
        location,
    }
}

fn visit_instance(
    pair: Pair<'_, Rule>,
    file: Option<&str>,
    resolver: &Resolver<'_>,
    diagnostics: &mut dyn DiagnosticSink,
) -> Option<Instance> {
    let location = location_from_pair(&pair);
    let mut inner = pair.into_inner();
    let name = inner.next()?.as_str().to_owned();

    let mut instance_of = None;
    let mut title = None;
    let mut seen = SeenKeys::new();
    let mut rules = Vec::new();

    for child in inner {
        match child.as_rule() {
            Rule::instance_metadata => {
                let Some(field) = child.into_inner().next() else { continue };
                let field_location = location_from_pair(&field);
                match field.as_rule() {
                    Rule::instanceof_metadata => {
                        let raw = field.into_inner().next().map(|p| p.as_str().to_owned()).unwrap_or_default();
                        match seen.mark("InstanceOf", &raw) {
                            None => instance_of = Some(resolver.resolve(&raw, INSTANCE_OF_KINDS)),
                            Some(prior) => duplicate_metadata(diagnostics, "InstanceOf", &prior, file, field_location),
                        }
                    }
                    Rule::title_metadata => {
                        let raw = field.into_inner().next().map(visit_string).unwrap_or_default();
                        match seen.mark("Title", &raw) {
                            None => title = Some(raw),
                            Some(prior) => duplicate_metadata(diagnostics, "Title", &prior, file, field_location),
                        }
                    }
                    _ => {}
                }
            }
            Rule::instance_rule => {
                if let Some(fixed) = child.into_inner().next() {
                    rules.push(visit_fixed_value_rule(fixed, resolver));
                }
            }
            _ => {}
        }
    }

    let Some(instance_of) = instance_of else {
        diagnostics.push(Diagnostic::error(
            format!("Instance '{name}' has no InstanceOf declaration; dropping it"),
            file,
            Some(location),
        ));
        return None;
    };

    Some(Instance {
        name,
        instance_of,
        title,
        rules,
        source_info: SourceInfo { file: file.map(str::to_owned), location },
    })
}

fn visit_value_set(
    pair: Pair<'_, Rule>,
    file: Option<&str>,
    resolver: &Resolver<'_>,
    diagnostics: &mut dyn DiagnosticSink,
) -> ValueSet {
    let location = location_from_pair(&pair);
    let mut inner = pair.into_inner();
    let name = inner.next().map(|p| p.as_str().to_owned()).unwrap_or_default();

    let mut id = None;
    let mut title = None;
    let mut description = None;
    let mut seen = SeenKeys::new();
    let mut components = Vec::new();

    for child in inner {
        match child.as_rule() {
            Rule::vs_metadata => {
                let Some(field) = child.into_inner().next() else { continue };
                let field_location = location_from_pair(&field);
                match field.as_rule() {
                    Rule::id_metadata => {
                        let raw = field.into_inner().next().map(|p| p.as_str().to_owned()).unwrap_or_default();
                        match seen.mark("Id", &raw) {
                            None => id = Some(raw),
                            Some(prior) => duplicate_metadata(diagnostics, "Id", &prior, file, field_location),
                        }
                    }
                    Rule::title_metadata => {
                        let raw = field.into_inner().next().map(visit_string).unwrap_or_default();
                        match seen.mark("Title", &raw) {
                            None => title = Some(raw),
                            Some(prior) => duplicate_metadata(diagnostics, "Title", &prior, file, field_location),
                        }
                    }
                    Rule::description_metadata => {
                        let raw = field.into_inner().next().map(visit_string_or_multiline).unwrap_or_default();
                        match seen.mark("Description", &raw) {
                            None => description = Some(raw),
                            Some(prior) => duplicate_metadata(diagnostics, "Description", &prior, file, field_location),
                        }
                    }
                    _ => {}
                }
            }
            Rule::vs_component => {
                if let Some(component) = visit_vs_component(child, file, resolver, diagnostics) {
                    components.push(component);
                }
            }
            _ => {}
        }
    }

    let components = merge_components(components);

    ValueSet {
        id: id.unwrap_or_else(|| name.clone()),
        name,
        title,
        description,
        components,
        source_info: SourceInfo { file: file.map(str::to_owned), location },
    }
}

fn visit_vs_component(
    pair: Pair<'_, Rule>,
    file: Option<&str>,
    resolver: &Resolver<'_>,
    diagnostics: &mut dyn DiagnosticSink,
) -> Option<ValueSetComponent> {
    let mut inclusion = true;
    let mut body = None;
    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::exclude_kw => inclusion = false,
            Rule::filter_component_body | Rule::concept_component_body => body = Some(child),
            _ => {}
        }
    }
    let body = body?;
    match body.as_rule() {
        Rule::concept_component_body => Some(ValueSetComponent::Concept(visit_concept_component(body, inclusion, file, resolver, diagnostics))),
        Rule::filter_component_body => Some(ValueSetComponent::Filter(visit_filter_component(body, inclusion, file, resolver, diagnostics))),
        _ => None,
    }
}

fn visit_concept_component(
    pair: Pair<'_, Rule>,
    inclusion: bool,
    file: Option<&str>,
    resolver: &Resolver<'_>,
    diagnostics: &mut dyn DiagnosticSink,
) -> ConceptComponent {
    let location = location_from_pair(&pair);
    let mut single_code = None;
    let mut code_list = None;
    let mut from = FromSpec::default();
    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::code_literal => single_code = Some(child),
            Rule::comma_delimited_codes => code_list = Some(child),
            Rule::from_clause => from = visit_from_clause(child, file, resolver, diagnostics),
            _ => {}
        }
    }

    let concepts = if let Some(code_pair) = single_code {
        vec![visit_concept_code(code_pair, &mut from, location, file, resolver, diagnostics)]
    } else if let Some(list_pair) = code_list {
        let codes = visit_comma_delimited_codes(list_pair);
        if from.system.is_none() {
            diagnostics.push(Diagnostic::error(
                "a comma-delimited code list requires a system in its 'from' clause",
                file,
                Some(location),
            ));
        }
        codes
            .into_iter()
            .map(|mut c| {
                if c.system.is_none() {
                    c.system = from.system.clone();
                }
                c
            })
            .collect()
    } else {
        Vec::new()
    };

    ConceptComponent { inclusion, from, concepts }
}

/// Resolve a single concept code against the component's `from.system`,
/// reconciling a system carried on the code itself with one carried on the
/// `from` clause and reporting the mismatch/missing diagnostics the spec
/// names (spec §4.5bis).
fn visit_concept_code(
    pair: Pair<'_, Rule>,
    from: &mut FromSpec,
    location: TextLocation,
    file: Option<&str>,
    resolver: &Resolver<'_>,
    diagnostics: &mut dyn DiagnosticSink,
) -> Code {
    let mut children = pair.into_inner().peekable();
    let mut raw_system = None;
    if let Some(first) = children.peek() {
        if first.as_rule() == Rule::sequence {
            raw_system = Some(first.as_str().to_owned());
            children.next();
        }
    }
    let code = children.next().map(code_part_text).unwrap_or_default();
    let display = children.next().map(visit_string);

    let system = match (raw_system, from.system.clone()) {
        (Some(raw), Some(_)) => {
            diagnostics.push(Diagnostic::error(
                format!("Concept {code} specifies system multiple times"),
                file,
                Some(location),
            ));
            Some(resolver.resolve(&raw, CODE_SYSTEM_KINDS))
        }
        (Some(raw), None) => {
            let resolved = resolver.resolve(&raw, CODE_SYSTEM_KINDS);
            from.system = Some(resolved.clone());
            Some(resolved)
        }
        (None, Some(from_system)) => Some(from_system),
        (None, None) => {
            diagnostics.push(Diagnostic::error(
                format!("Concept {code} must include system as 'SYSTEM#CONCEPT' or '#CONCEPT from system SYSTEM'"),
                file,
                Some(location),
            ));
            None
        }
    };

    Code { code, system, display }
}

fn visit_filter_component(
    pair: Pair<'_, Rule>,
    inclusion: bool,
    file: Option<&str>,
    resolver: &Resolver<'_>,
    diagnostics: &mut dyn DiagnosticSink,
) -> FilterComponent {
    let location = location_from_pair(&pair);
    let mut from = FromSpec::default();
    let mut filters = Vec::new();
    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::from_clause => from = visit_from_clause(child, file, resolver, diagnostics),
            Rule::filter_expr => {
                if let Some(filter) = visit_filter_expr(child, file, diagnostics) {
                    filters.push(filter);
                }
            }
            _ => {}
        }
    }
    if from.system.is_none() {
        diagnostics.push(Diagnostic::error("a filter component requires a system in its 'from' clause", file, Some(location)));
    }
    FilterComponent { inclusion, from, filters }
}

fn visit_filter_expr(pair: Pair<'_, Rule>, file: Option<&str>, diagnostics: &mut dyn DiagnosticSink) -> Option<VsFilter> {
    let location = location_from_pair(&pair);
    let mut inner = pair.into_inner();
    let property = inner.next()?.as_str().to_owned();
    let operator_pair = inner.next()?;
    let operator = VsOperator::parse(operator_pair.as_str())?;
    let value = inner.next().map(visit_filter_value);

    if let Some(value) = &value {
        if !value.matches_operator(operator) {
            diagnostics.push(Diagnostic::error(
                format!("filter value for '{property}' does not match operator '{}'", operator_pair.as_str()),
                file,
                Some(location),
            ));
        }
    } else if operator.requires_value() {
        diagnostics.push(Diagnostic::error(
            format!("filter operator '{}' on '{property}' requires a value", operator_pair.as_str()),
            file,
            Some(location),
        ));
    }

    Some(VsFilter { property, operator, value })
}

fn visit_filter_value(pair: Pair<'_, Rule>) -> VsFilterValue {
    // `pair` is the `filter_value` wrapper rule; drill into whichever
    // alternative actually matched.
    let Some(pair) = pair.into_inner().next() else {
        return VsFilterValue::String(String::new());
    };
    match pair.as_rule() {
        Rule::boolean => VsFilterValue::Boolean(pair.as_str() == "true"),
        Rule::regex_literal => VsFilterValue::Regex(pair.as_str().trim_matches('/').to_owned()),
        Rule::code_literal => VsFilterValue::Code(visit_code_literal_bare(pair)),
        Rule::string => VsFilterValue::String(visit_string(pair)),
        _ => VsFilterValue::String(pair.as_str().to_owned()),
    }
}

/// A code literal appearing as a filter value, where system aliases are not
/// meaningfully resolvable against the document's own symbol table in the
/// same way a concept's system is; the code and any inline system sequence
/// are both kept as written.
fn visit_code_literal_bare(pair: Pair<'_, Rule>) -> Code {
    let mut system = None;
    let mut code = String::new();
    let mut display = None;
    let mut children = pair.into_inner().peekable();
    if let Some(first) = children.peek() {
        if first.as_rule() == Rule::sequence {
            system = Some(first.as_str().to_owned());
            children.next();
        }
    }
    if let Some(code_part) = children.next() {
        code = code_part_text(code_part);
    }
    if let Some(display_pair) = children.next() {
        display = Some(visit_string(display_pair));
    }
    Code { code, system, display }
}

fn visit_from_clause(
    pair: Pair<'_, Rule>,
    file: Option<&str>,
    resolver: &Resolver<'_>,
    diagnostics: &mut dyn DiagnosticSink,
) -> FromSpec {
    let mut from = FromSpec::default();
    for item in pair.into_inner() {
        if item.as_rule() != Rule::from_item {
            continue;
        }
        let Some(kind_pair) = item.into_inner().next() else { continue };
        match kind_pair.as_rule() {
            Rule::sequence => {
                let system = resolver.resolve(kind_pair.as_str(), CODE_SYSTEM_KINDS);
                if let Some(existing) = &from.system {
                    if existing != &system {
                        diagnostics.push(Diagnostic::warn(
                            format!("conflicting 'from system' values '{existing}' and '{system}'; keeping the first"),
                            file,
                            None,
                        ));
                    }
                } else {
                    from.system = Some(system);
                }
            }
            Rule::comma_delimited_sequences => {
                for seq in kind_pair.into_inner() {
                    from.value_sets.push(resolver.resolve(seq.as_str(), VALUE_SET_KINDS));
                }
            }
            _ => {}
        }
    }
    from
}

fn visit_comma_delimited_codes(pair: Pair<'_, Rule>) -> Vec<Code> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::code_list_part)
        .map(|p| Code { code: p.as_str().trim_matches('"').to_owned(), system: None, display: None })
        .collect()
}

/// Merge value-set components that share `(componentKind, inclusion,
/// from.system, sorted(from.valueSets))` (spec I5).
fn merge_components(components: Vec<ValueSetComponent>) -> Vec<ValueSetComponent> {
    let mut order: Vec<(bool, Option<String>, Vec<String>, bool)> = Vec::new();
    let mut merged: IndexMap<(bool, Option<String>, Vec<String>, bool), ValueSetComponent> = IndexMap::new();

    for component in components {
        let (inclusion, from, is_concept) = match &component {
            ValueSetComponent::Concept(c) => (c.inclusion, &c.from, true),
            ValueSetComponent::Filter(f) => (f.inclusion, &f.from, false),
        };
        let key = (inclusion, from.system.clone(), from.sorted_value_sets(), is_concept);

        match merged.get_mut(&key) {
            Some(ValueSetComponent::Concept(existing)) => {
                if let ValueSetComponent::Concept(new) = component {
                    existing.concepts.extend(new.concepts);
                }
            }
            Some(ValueSetComponent::Filter(existing)) => {
                if let ValueSetComponent::Filter(new) = component {
                    existing.filters.extend(new.filters);
                }
            }
            None => {
                order.push(key.clone());
                merged.insert(key, component);
            }
        }
    }

    order.into_iter().filter_map(|key| merged.shift_remove(&key)).collect()
}

fn visit_value(pair: Pair<'_, Rule>, resolver: &Resolver<'_>) -> LiteralValue {
    // `pair` is the `value` wrapper rule; drill into whichever alternative
    // actually matched.
    let Some(pair) = pair.into_inner().next() else {
        return LiteralValue::String(String::new());
    };
    match pair.as_rule() {
        Rule::string => LiteralValue::String(visit_string(pair)),
        Rule::multiline_string => LiteralValue::MultilineString(dedent_multiline(pair.as_str())),
        Rule::number => LiteralValue::Number(pair.as_str().parse().unwrap_or(0.0)),
        Rule::datetime => LiteralValue::DateTime(pair.as_str().to_owned()),
        Rule::time => LiteralValue::Time(pair.as_str().to_owned()),
        Rule::boolean => LiteralValue::Boolean(pair.as_str() == "true"),
        Rule::code_literal => LiteralValue::Code(visit_code_literal(pair, resolver)),
        Rule::reference_literal => LiteralValue::Reference(visit_reference_literal(pair, resolver)),
        Rule::ratio_literal => LiteralValue::Ratio(visit_ratio_literal(pair)),
        Rule::quantity_literal => LiteralValue::Quantity(visit_quantity_literal(pair)),
        _ => LiteralValue::String(pair.as_str().to_owned()),
    }
}

fn visit_code_literal(pair: Pair<'_, Rule>, resolver: &Resolver<'_>) -> Code {
    let mut children = pair.into_inner().peekable();
    let mut system = None;
    if let Some(first) = children.peek() {
        if first.as_rule() == Rule::sequence {
            system = Some(resolver.resolve(first.as_str(), CODE_SYSTEM_KINDS));
            children.next();
        }
    }
    let code = children.next().map(code_part_text).unwrap_or_default();
    let display = children.next().map(visit_string);
    Code { code, system, display }
}

/// `pair` is the `code_part` wrapper rule; drill into its single child
/// (`string` or `sequence`) to get the actual code text.
fn code_part_text(pair: Pair<'_, Rule>) -> String {
    match pair.into_inner().next() {
        Some(child) if child.as_rule() == Rule::string => visit_string(child),
        Some(child) => child.as_str().to_owned(),
        None => String::new(),
    }
}

fn visit_reference_literal(pair: Pair<'_, Rule>, resolver: &Resolver<'_>) -> Reference {
    let mut sequences = Vec::new();
    let mut display = None;
    for child in pair.into_inner() {
        match child.as_rule() {
            Rule::sequence => sequences.push(child.as_str().to_owned()),
            Rule::string => display = Some(visit_string(child)),
            _ => {}
        }
    }
    let reference = sequences
        .first()
        .map(|s| resolver.resolve(s, REFERENCE_TARGET_KINDS))
        .unwrap_or_default();
    Reference { reference, display }
}

fn visit_ratio_literal(pair: Pair<'_, Rule>) -> Ratio {
    let mut parts = pair.into_inner();
    let numerator = parts.next().map(visit_ratio_part).unwrap_or(Quantity { value: 0.0, unit: None });
    let denominator = parts.next().map(visit_ratio_part).unwrap_or(Quantity { value: 0.0, unit: None });
    Ratio { numerator, denominator }
}

fn visit_ratio_part(pair: Pair<'_, Rule>) -> Quantity {
    let Some(inner) = pair.into_inner().next() else {
        return Quantity { value: 0.0, unit: None };
    };
    match inner.as_rule() {
        Rule::quantity_literal => visit_quantity_literal(inner),
        Rule::number => Quantity { value: inner.as_str().parse().unwrap_or(0.0), unit: None },
        _ => Quantity { value: 0.0, unit: None },
    }
}

fn visit_quantity_literal(pair: Pair<'_, Rule>) -> Quantity {
    let mut inner = pair.into_inner();
    let value = inner.next().map(|p| p.as_str().parse().unwrap_or(0.0)).unwrap_or(0.0);
    let unit = inner.next().map(|p| Code {
        code: p.as_str().trim_matches('\'').to_owned(),
        system: Some(UCUM_SYSTEM.to_owned()),
        display: None,
    });
    Quantity { value, unit }
}

fn visit_string(pair: Pair<'_, Rule>) -> String {
    match pair.into_inner().next() {
        Some(inner) => unescape_single_line(inner.as_str()),
        None => String::new(),
    }
}

fn visit_string_or_multiline(pair: Pair<'_, Rule>) -> String {
    match pair.as_rule() {
        Rule::multiline_string => dedent_multiline(pair.as_str()),
        _ => visit_string(pair),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::EmptyDefinitionProvider;
    use crate::diagnostic::VecSink;
    use crate::parser::parse_document;
    use crate::preprocessor::{self, ParsedDocument};

    fn visit(source: &str) -> (DocumentIr, Vec<Diagnostic>) {
        let mut diags = Vec::new();
        let pairs = parse_document(source, None, &mut diags).expect("parses");
        let docs = vec![ParsedDocument { file: None, pairs: pairs.clone() }];
        let mut sink = VecSink::default();
        let table = preprocessor::run(&docs, "http://ex.org", &mut sink);
        diags.extend(sink.0);
        let defs = EmptyDefinitionProvider;
        let resolver = Resolver::new(&table, &defs);
        let mut sink = VecSink::default();
        let doc = visit_document(pairs, None, &resolver, &mut sink);
        diags.extend(sink.0);
        (doc, diags)
    }

    #[test]
    fn profile_defaults_parent_to_resource() {
        let (doc, diags) = visit("Profile: Foo\n");
        assert!(diags.is_empty());
        assert_eq!(doc.profiles["Foo"].parent, "Resource");
    }

    #[test]
    fn extension_defaults_parent_to_extension() {
        let (doc, _) = visit("Extension: Bar\n");
        assert_eq!(doc.extensions["Bar"].parent, "Extension");
    }

    #[test]
    fn card_rule_with_flags_synthesizes_flag_rule() {
        let (doc, _) = visit("Profile: Foo\n* name 0..1 MS\n");
        let rules = &doc.profiles["Foo"].rules;
        assert_eq!(rules.len(), 2);
        assert!(matches!(rules[0], IrRule::Card(_)));
        match &rules[1] {
            IrRule::Flag(f) => assert!(f.must_support),
            other => panic!("expected flag rule, got {other:?}"),
        }
    }

    #[test]
    fn flag_rule_path_list_expands_to_one_rule_per_path() {
        let (doc, _) = visit("Profile: Foo\n* name, gender MS\n");
        let rules = &doc.profiles["Foo"].rules;
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn instance_without_instance_of_is_dropped_with_diagnostic() {
        let (doc, diags) = visit("Instance: Bad\nTitle: \"no instanceof\"\n");
        assert!(doc.instances.is_empty());
        assert!(diags.iter().any(|d| d.message.contains("InstanceOf")));
    }

    #[test]
    fn duplicate_title_reports_and_keeps_first() {
        let (doc, diags) = visit("Profile: Foo\nTitle: \"first\"\nTitle: \"second\"\n");
        assert_eq!(doc.profiles["Foo"].title.as_deref(), Some("first"));
        assert!(diags
            .iter()
            .any(|d| d.level == crate::diagnostic::Severity::Error && d.message.contains("already declared with value 'first'")));
    }

    #[test]
    fn value_set_merges_concept_components_sharing_from() {
        let src = "ValueSet: VS\n* http://s#a\n* http://s#b\n";
        let (doc, diags) = visit(src);
        assert!(diags.is_empty(), "{diags:?}");
        let vs = &doc.value_sets["VS"];
        assert_eq!(vs.components.len(), 1);
        match &vs.components[0] {
            ValueSetComponent::Concept(c) => {
                assert_eq!(c.concepts.len(), 2);
                assert_eq!(c.from.system.as_deref(), Some("http://s"));
            }
            other => panic!("expected concept component, got {other:?}"),
        }
    }

    #[test]
    fn concept_with_conflicting_systems_reports_error() {
        let src = "ValueSet: VS\n* http://a#x from system http://b\n";
        let (doc, diags) = visit(src);
        assert!(diags.iter().any(|d| d.message.contains("specifies system multiple times")));
        let vs = &doc.value_sets["VS"];
        match &vs.components[0] {
            ValueSetComponent::Concept(c) => assert_eq!(c.concepts[0].system.as_deref(), Some("http://a")),
            other => panic!("expected concept component, got {other:?}"),
        }
    }

    #[test]
    fn concept_with_no_system_anywhere_reports_error() {
        let (doc, diags) = visit("ValueSet: VS\n* #bare\n");
        assert!(diags.iter().any(|d| d.message.contains("must include system")));
        let vs = &doc.value_sets["VS"];
        match &vs.components[0] {
            ValueSetComponent::Concept(c) => assert_eq!(c.concepts[0].system, None),
            other => panic!("expected concept component, got {other:?}"),
        }
    }

    #[test]
    fn only_rule_expands_reference_choices() {
        let (doc, _) = visit("Profile: Foo\n* subject only Reference(Patient|Group)\n");
        match &doc.profiles["Foo"].rules[0] {
            IrRule::Only(rule) => assert_eq!(rule.types.len(), 2),
            other => panic!("expected only rule, got {other:?}"),
        }
    }

    #[test]
    fn contains_rule_synthesizes_per_item_card_rule() {
        let (doc, _) = visit("Extension: Foo\n* extension contains bar 0..1\n");
        let rules = &doc.extensions["Foo"].rules;
        assert!(rules.iter().any(|r| matches!(r, IrRule::Card(c) if c.path == "extension[bar]")));
        assert!(rules.iter().any(|r| matches!(r, IrRule::Contains(c) if c.items == vec!["bar".to_string()])));
    }

    #[test]
    fn fixed_value_rule_resolves_code_system_alias() {
        let src = "Alias: LNC = http://loinc.org\nProfile: Foo\n* code = LNC#1234 \"Display\"\n";
        let (doc, diags) = visit(src);
        assert!(diags.is_empty(), "{diags:?}");
        match &doc.profiles["Foo"].rules[0] {
            IrRule::FixedValue(rule) => match &rule.value {
                LiteralValue::Code(code) => {
                    assert_eq!(code.system.as_deref(), Some("http://loinc.org"));
                    assert_eq!(code.code, "1234");
                    assert_eq!(code.display.as_deref(), Some("Display"));
                }
                other => panic!("expected code value, got {other:?}"),
            },
            other => panic!("expected fixed value rule, got {other:?}"),
        }
    }
}
