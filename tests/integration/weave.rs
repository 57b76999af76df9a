mod common;
use common::{game_module, woven_game, write_artifact};

use prewire::binary::{Artifact, SymbolEntry, SymbolTable};
use prewire::content_hash;
use prewire::diagnostics::WeaveError;
use prewire::ir::builder::{MethodBuilder, ModuleBuilder, TypeBuilder};
use prewire::ir::{Annotation, CONTAINER_TYPE, CallableKind, Instr, OBJECT_TYPE, Visibility};
use prewire::weave::registrar::BAKE_METHOD;
use prewire::weave::synth::{FACTORY_METHOD, GENERATED_TAG, INJECTOR_METHOD};
use prewire::weave::{WeaveOptions, WeaveOutcome, weave_artifact, weave_module};

#[test]
fn report_lists_targets_in_type_order() {
    let mut module = game_module();
    let WeaveOutcome::Woven(report) = weave_module(&mut module, &WeaveOptions::default()).unwrap() else {
        panic!("expected the Game module to be woven");
    };
    assert_eq!(report.module, "Game");
    assert_eq!(report.registrar, "Game.PrewireRegistrar");
    assert_eq!(report.factories, vec!["Game.ConsoleLogger", "Game.Clock", "Game.Engine", "Game.Player"]);
    assert_eq!(report.injectors, vec!["Game.Player"]);
}

#[test]
fn factory_resolves_constructor_parameters_in_declared_order() {
    let module = woven_game();
    let engine = module.type_named("Game.Engine").unwrap();
    let factory = engine.method_named(FACTORY_METHOD).unwrap();
    let ctor_id = engine.constructors[0].id;

    assert!(factory.is_static);
    assert_eq!(factory.visibility, Visibility::Public);
    assert_eq!(factory.params.len(), 1);
    assert_eq!(factory.params[0].ty, CONTAINER_TYPE);
    assert_eq!(factory.return_type.as_deref(), Some(OBJECT_TYPE));
    assert_eq!(factory.body, vec![
        Instr::LoadArg(0),
        Instr::Resolve { ty: "Game.ILogger".into() },
        Instr::LoadArg(0),
        Instr::Resolve { ty: "Game.Clock".into() },
        Instr::NewObj { owner: "Game.Engine".into(), ctor: ctor_id },
        Instr::Upcast { ty: OBJECT_TYPE.into() },
        Instr::Return,
    ]);
}

#[test]
fn injector_assigns_each_marked_field() {
    let module = woven_game();
    let player = module.type_named("Game.Player").unwrap();
    let injector = player.method_named(INJECTOR_METHOD).unwrap();
    assert_eq!(injector.params.len(), 2);
    assert_eq!(injector.params[0].ty, "Game.Player");
    assert_eq!(injector.params[1].ty, CONTAINER_TYPE);
    assert_eq!(injector.return_type, None);
    assert_eq!(injector.body, vec![
        Instr::LoadArg(0),
        Instr::LoadArg(1),
        Instr::Resolve { ty: "Game.ILogger".into() },
        Instr::StoreField { owner: "Game.Player".into(), field: "logger".into() },
        Instr::Return,
    ]);
    // Unmarked fields keep their visibility
    assert_eq!(player.field("score").unwrap().visibility, Visibility::Private);
    assert_eq!(player.field("logger").unwrap().visibility, Visibility::Public);
}

#[test]
fn touched_types_and_members_are_widened() {
    let original = game_module();
    assert_eq!(original.type_named("Game.Engine").unwrap().visibility, Visibility::Private);

    let module = woven_game();
    for name in ["Game.ConsoleLogger", "Game.Clock", "Game.Engine", "Game.Player"] {
        let ty = module.type_named(name).unwrap();
        assert_eq!(ty.visibility, Visibility::Public, "{name}");
        assert_eq!(ty.constructors[0].visibility, Visibility::Public, "{name}");
    }
    // Untouched types stay as declared
    assert_eq!(module.type_named("Game.Main").unwrap().visibility, Visibility::Private);
}

#[test]
fn registrar_bakes_factories_then_injectors() {
    let module = woven_game();
    let registrar = module.type_named("Game.PrewireRegistrar").unwrap();
    assert!(registrar.is_abstract);
    assert_eq!(registrar.visibility, Visibility::Public);

    let bake = registrar.method_named(BAKE_METHOD).unwrap();
    assert!(bake.is_static);
    assert!(bake.params.is_empty());
    assert!(bake.has_annotation(&Annotation::RuntimeLoadHook));
    assert!(bake.has_annotation(&Annotation::Custom(GENERATED_TAG.into())));

    let registrations: Vec<(CallableKind, &str)> = bake.body.iter()
        .filter_map(|i| match i {
            Instr::Register { kind, ty } => Some((*kind, ty.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(registrations, vec![
        (CallableKind::Factory, "Game.ConsoleLogger"),
        (CallableKind::Factory, "Game.Clock"),
        (CallableKind::Factory, "Game.Engine"),
        (CallableKind::Factory, "Game.Player"),
        (CallableKind::Injector, "Game.Player"),
    ]);
    assert_eq!(bake.body.last(), Some(&Instr::Return));
}

#[test]
fn editor_only_module_gets_editor_hook() {
    let mut module = game_module();
    let options = WeaveOptions { editor_only: true, ..WeaveOptions::default() };
    weave_module(&mut module, &options).unwrap();
    let bake = module.type_named("Game.PrewireRegistrar").unwrap().method_named(BAKE_METHOD).unwrap();
    assert!(bake.has_annotation(&Annotation::EditorLoadHook));
    assert!(!bake.has_annotation(&Annotation::RuntimeLoadHook));
}

#[test]
fn custom_registrar_name() {
    let mut module = game_module();
    let options = WeaveOptions { registrar_name: "Bootstrap".into(), ..WeaveOptions::default() };
    weave_module(&mut module, &options).unwrap();
    assert!(module.type_named("Game.Bootstrap").is_some());
    assert!(module.type_named("Game.PrewireRegistrar").is_none());
}

#[test]
fn stamp_records_pre_weave_hash() {
    let original = game_module();
    let expected = content_hash::to_hex(&content_hash::hash_module(&original).unwrap());
    let mut module = original.clone();
    weave_module(&mut module, &WeaveOptions::default()).unwrap();
    let stamp = module.stamp.unwrap();
    assert_eq!(stamp.source_hash, expected);
    assert_eq!(stamp.tool_version, env!("CARGO_PKG_VERSION"));
    assert_eq!((stamp.factories, stamp.injectors), (4, 1));
}

#[test]
fn reweaving_is_a_no_op() {
    let mut module = woven_game();
    let once = module.clone();
    assert_eq!(weave_module(&mut module, &WeaveOptions::default()).unwrap(), WeaveOutcome::AlreadyWoven);
    assert_eq!(module, once);
}

#[test]
fn abstract_and_interface_markers_are_ignored() {
    let mut module = ModuleBuilder::new("Shapes")
        .references_runtime()
        .ty(TypeBuilder::class("Shapes.Shape").abstract_class()
            .constructor(MethodBuilder::constructor().inject().build())
            .build())
        .build();
    assert_eq!(weave_module(&mut module, &WeaveOptions::default()).unwrap(), WeaveOutcome::NothingToWeave);
}

#[test]
fn only_first_marked_constructor_is_used() {
    let first = MethodBuilder::constructor().inject().param("a", "int").build();
    let first_id = first.id;
    let mut module = ModuleBuilder::new("M")
        .ty(TypeBuilder::class("M.Svc")
            .constructor(first)
            .constructor(MethodBuilder::constructor().inject().build())
            .build())
        .build();
    weave_module(&mut module, &WeaveOptions::default()).unwrap();
    let factory = module.type_named("M.Svc").unwrap().method_named(FACTORY_METHOD).unwrap();
    assert!(factory.body.contains(&Instr::NewObj { owner: "M.Svc".into(), ctor: first_id }));
}

#[test]
fn artifact_is_rewritten_with_symbols_intact() {
    let dir = tempfile::tempdir().unwrap();
    let module = game_module();
    let symbols = SymbolTable {
        entries: vec![SymbolEntry {
            member: module.type_named("Game.Engine").unwrap().constructors[0].id,
            file: "Engine.src".into(),
            line: 12,
        }],
    };
    let path = dir.path().join("Game.pwm");
    Artifact::with_symbols(module, symbols.clone()).save(&path).unwrap();

    let outcome = weave_artifact(&path, &WeaveOptions::default()).unwrap();
    assert!(matches!(outcome, WeaveOutcome::Woven(_)));

    let rewritten = Artifact::open(&path).unwrap();
    assert_eq!(rewritten.symbols, symbols);
    assert!(rewritten.module.stamp.is_some());
    assert!(!dir.path().join("Game.pwm.weaving").exists());
}

#[test]
fn failed_weave_leaves_artifact_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let mut module = game_module();
    // A pre-existing member named like the injector makes synthesis fail late.
    module.type_named_mut("Game.Player").unwrap()
        .methods.push(MethodBuilder::static_method(INJECTOR_METHOD).build());
    let path = write_artifact(dir.path(), "Game.pwm", module);
    let before = std::fs::read(&path).unwrap();

    let err = weave_artifact(&path, &WeaveOptions::default()).unwrap_err();
    assert!(matches!(err, WeaveError::NameCollision { .. }));
    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert!(!dir.path().join("Game.pwm.weaving").exists());
}

#[test]
fn unwoven_artifact_is_not_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let module = ModuleBuilder::new("Plain").ty(TypeBuilder::class("Plain.A").build()).build();
    let path = write_artifact(dir.path(), "Plain.pwm", module);
    let before = std::fs::read(&path).unwrap();
    assert_eq!(weave_artifact(&path, &WeaveOptions::default()).unwrap(), WeaveOutcome::NothingToWeave);
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

#[test]
fn corrupt_artifact_is_an_artifact_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.pwm");
    std::fs::write(&path, b"not an artifact at all").unwrap();
    let err = weave_artifact(&path, &WeaveOptions::default()).unwrap_err();
    assert!(matches!(err, WeaveError::Artifact(_)));
}
