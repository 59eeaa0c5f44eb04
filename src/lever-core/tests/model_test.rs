use std::sync::Arc;

use lever_core::converter::{
    ArgumentConverterStore, BiMapArgumentConverter, SimpleArgumentConverter,
    register_default_converters,
};
use lever_core::inject::{MapBackedValueStore, MemoizingValueAccess, MergedValueAccess};
use lever_core::prelude::*;
use lever_core::{ArgumentConverter, ArgumentConverterAccessExt, Qualifier};
use pretty_assertions::assert_eq;

#[derive(Debug, PartialEq, Eq, Hash)]
struct HomeWorld;
impl lever_core::InjectQualifier for HomeWorld {}

fn home_world() -> Key<String> {
    Key::qualified(Qualifier::tag::<HomeWorld>())
}

#[test]
fn test_usage_line() {
    let command = Command::builder("build")
        .part(NoArgCommandFlag::new('v', "Verbose"))
        .part(NoArgCommandFlag::new('q', "Quiet"))
        .part(
            ArgAcceptingCommandFlag::builder('o', "Output")
                .argument_name("file")
                .build(),
        )
        .part(CommandArgument::builder("target", "").build())
        .part(
            CommandArgument::builder("extra", "")
                .variable(true)
                .defaults(["all"])
                .build(),
        )
        .build();

    assert_eq!(command.usage(), "build [-vq] [-o <file>] <target> [extra...]");
}

#[test]
fn test_converter_reads_injected_context() {
    let mut store = ArgumentConverterStore::new();
    register_default_converters(&mut store);
    store.register(
        Key::<String>::qualified(Qualifier::tag::<HomeWorld>()),
        SimpleArgumentConverter::from_single("a world name or ~", |input, context| {
            if input == "~" {
                context
                    .injected_value(&home_world())
                    .map(|world| world.to_string())
            } else {
                Some(input.to_string())
            }
        })
        .with_suggestions(|input| vec![format!("{input}~")]),
    );

    let context = MapBackedValueStore::new().with_value(home_world(), "overworld".to_string());
    let converter = store.converter(&home_world()).unwrap();

    let converted = converter.convert("~", &context).unwrap();
    assert_eq!(converted.into_values(), vec!["overworld".to_string()]);
    assert!(converter.convert("~", &MapBackedValueStore::new()).is_err());
    assert_eq!(converter.suggestions("x", &context), vec!["x~".to_string()]);
}

#[test]
fn test_layered_injection() {
    let caller = MapBackedValueStore::new().with_value(home_world(), "nether".to_string());
    let mut manager_values = MapBackedValueStore::new()
        .with_value(home_world(), "overworld".to_string())
        .with_value(Key::<u32>::of(), 7);
    manager_values.inject_with(Key::<u64>::of(), |store| {
        store.injected_value(&Key::<u32>::of()).map(|n| u64::from(*n) * 2)
    });

    let merged = MergedValueAccess::of(Arc::new(caller), Arc::new(manager_values));
    let memo = MemoizingValueAccess::new(Arc::new(merged));

    assert_eq!(
        memo.injected_value(&home_world()).as_deref(),
        Some(&"nether".to_string())
    );
    assert_eq!(memo.injected_value(&Key::<u64>::of()).as_deref(), Some(&14));
    assert!(memo.injected_value(&Key::<i8>::of()).is_none());

    let snapshot = memo.snapshot_memory();
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.contains(home_world().erased()));
}

#[test]
fn test_bimap_round_trips_values() {
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    enum GameMode {
        Survival,
        Creative,
    }

    let converter = BiMapArgumentConverter::new([
        ("survival".to_string(), GameMode::Survival),
        ("creative".to_string(), GameMode::Creative),
    ]);
    let context = MapBackedValueStore::new();

    let mode = converter.convert("creative", &context).unwrap().into_values();
    assert_eq!(mode, vec![GameMode::Creative]);
    assert_eq!(converter.key_for(&GameMode::Survival), Some("survival"));
    assert_eq!(converter.describe_acceptable_arguments(), "survival|creative");
}

#[test]
fn test_condition_combinators() {
    let quiet = NoArgCommandFlag::new('q', "Quiet");
    let flagged = quiet.clone();
    let is_quiet = Condition::from_fn(move |params| params.has(&flagged));

    let mut params = CommandParameters::empty();
    assert!(is_quiet.clone().not().satisfied(&params));
    params.mark_present(&quiet.into());

    assert!(is_quiet.clone().and(Condition::Always).satisfied(&params));
    assert!(!is_quiet.clone().and(Condition::Never).satisfied(&params));
    assert!(Condition::Never.or(is_quiet).satisfied(&params));
}
