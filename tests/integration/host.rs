mod common;
use common::{game_module, player_host, woven_game, write_artifact};

use std::rc::Rc;

use prewire::binary::Artifact;
use prewire::ir::builder::{MethodBuilder, ModuleBuilder, TypeBuilder};
use prewire::ir::{Annotation, CallableKind, Instr};
use prewire::runtime::{Container, Host, HostConfig, HostMode, Object, RuntimeError, Value};
use prewire::weave::{WeaveOptions, weave_module};

#[test]
fn loading_runs_the_baking_routine_once() {
    let host = player_host();
    let report = host.load(woven_game()).unwrap();
    assert_eq!(report.module, "Game");
    assert_eq!(report.hooks_run, 1);
    assert_eq!((report.factories, report.injectors), (4, 1));
    assert_eq!(host.registry().registered_factories(), vec![
        "Game.Clock", "Game.ConsoleLogger", "Game.Engine", "Game.Player",
    ]);
    assert_eq!(host.registry().registered_injectors(), vec!["Game.Player"]);
    assert!(host.is_loaded("Game"));
}

#[test]
fn loading_twice_is_rejected_without_reregistering() {
    let host = player_host();
    host.load(woven_game()).unwrap();
    let err = host.load(woven_game()).unwrap_err();
    assert!(matches!(err, RuntimeError::Load { .. }));
    assert_eq!(host.registry().factory_count(), 4);
}

#[test]
fn player_host_skips_editor_hooks() {
    let mut module = game_module();
    weave_module(&mut module, &WeaveOptions { editor_only: true, ..WeaveOptions::default() }).unwrap();

    let player = player_host();
    let report = player.load(module.clone()).unwrap();
    assert_eq!(report.hooks_run, 0);
    assert_eq!(player.registry().factory_count(), 0);

    let editor = Host::new(HostConfig { mode: HostMode::Editor, ..HostConfig::default() });
    let report = editor.load(module).unwrap();
    assert_eq!(report.hooks_run, 1);
    assert_eq!(editor.registry().factory_count(), 4);
}

#[test]
fn native_registration_collides_with_woven_one() {
    let host = player_host();
    host.registry()
        .register_factory("Game.Clock", Rc::new(|_: &Container| Ok(Value::from(Object::native("Game.Clock")))))
        .unwrap();
    let err = host.load(woven_game()).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::DuplicateRegistration { ref ty, kind: CallableKind::Factory } if ty == "Game.Clock"
    ));
}

#[test]
fn load_from_artifact_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_artifact(dir.path(), "Game.pwm", woven_game());
    let host = player_host();
    let report = host.load_artifact(Artifact::open(&path).unwrap()).unwrap();
    assert_eq!(report.factories, 4);
}

#[test]
fn invoke_runs_static_entry_points() {
    let host = player_host();
    host.load(woven_game()).unwrap();
    assert!(host.invoke("Game.Main", "Run", vec![]).unwrap().is_none());
    assert_eq!(host.take_output(), vec!["0".to_string(), "done".to_string()]);
    assert!(host.take_output().is_empty());
}

#[test]
fn unwoven_module_registers_nothing() {
    let host = player_host();
    let report = host.load(game_module()).unwrap();
    assert_eq!(report.hooks_run, 0);
    assert_eq!((report.factories, report.injectors), (0, 0));
}

#[test]
fn registering_a_private_type_fails_at_load() {
    // A hand-written baking routine for a type nobody widened.
    let factory = MethodBuilder::static_method("Make")
        .public()
        .param("container", "Prewire.Container")
        .returns("object")
        .body(vec![Instr::LoadConst(prewire::ir::Const::Null), Instr::Return])
        .build();
    let factory_id = factory.id;
    let module = ModuleBuilder::new("Hand")
        .ty(TypeBuilder::class("Hand.Svc").method(factory).build())
        .ty(TypeBuilder::class("Hand.Registrar").public()
            .method(MethodBuilder::static_method("Bake")
                .public()
                .annotate(Annotation::RuntimeLoadHook)
                .body(vec![
                    Instr::LoadMethod { owner: "Hand.Svc".into(), method: factory_id },
                    Instr::Register { kind: CallableKind::Factory, ty: "Hand.Svc".into() },
                ])
                .build())
            .build())
        .build();

    let host = player_host();
    let err = host.load(module).unwrap_err();
    assert!(matches!(err, RuntimeError::Execution { .. }));
    assert!(err.to_string().contains("must be public"), "{err}");
}

#[test]
fn private_members_of_other_types_are_unreachable() {
    let hidden = MethodBuilder::static_method("Secret").build();
    let hidden_id = hidden.id;
    let module = ModuleBuilder::new("Hand")
        .ty(TypeBuilder::class("Hand.Svc").public().method(hidden).build())
        .ty(TypeBuilder::class("Hand.Registrar")
            .method(MethodBuilder::static_method("Bake")
                .annotate(Annotation::RuntimeLoadHook)
                .body(vec![
                    Instr::LoadMethod { owner: "Hand.Svc".into(), method: hidden_id },
                    Instr::Pop,
                ])
                .build())
            .build())
        .build();

    let host = player_host();
    let err = host.load(module).unwrap_err();
    assert!(err.to_string().contains("not accessible"), "{err}");
}

#[test]
fn fallback_builds_unwoven_types() {
    let host = Host::new(HostConfig { introspection_fallback: true, ..HostConfig::default() });
    host.load(game_module()).unwrap();
    let c = host.container();
    c.bind("Game.ILogger").to("Game.ConsoleLogger").as_singleton();
    c.bind("Game.Clock").as_singleton();
    c.bind("Game.Player").as_transient();
    c.bind("Game.Engine").as_transient();

    let engine = c.resolve("Game.Engine").unwrap();
    let engine = engine.as_object().unwrap();
    assert!(engine.get("clock").unwrap().same_as(&c.resolve("Game.Clock").unwrap()));

    let player = c.resolve("Game.Player").unwrap();
    assert_eq!(player.as_object().unwrap().get("logger").unwrap().type_name(), "Game.ConsoleLogger");

    // Nothing was registered, entries are cached fallbacks
    assert_eq!(host.registry().factory_count(), 0);
    assert!(host.registry().cached_fallback_count() >= 4);
}

#[test]
fn woven_entries_take_precedence_over_fallback() {
    let host = Host::new(HostConfig { introspection_fallback: true, ..HostConfig::default() });
    host.load(woven_game()).unwrap();
    let c = host.container();
    c.bind("Game.Clock").as_transient();
    c.resolve("Game.Clock").unwrap();
    assert_eq!(host.registry().cached_fallback_count(), 0);
}
