#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;

use prewire::binary::Artifact;
use prewire::ir::builder::{FieldBuilder, MethodBuilder, ModuleBuilder, TypeBuilder};
use prewire::ir::{Const, Instr, Module, Visibility};
use prewire::runtime::{Host, HostConfig};
use prewire::weave::{WeaveOptions, WeaveOutcome, weave_module};

pub fn prewire() -> Command {
    Command::new(env!("CARGO_BIN_EXE_prewire"))
}

/// The "Game" module:
///
/// * `Game.ILogger`: interface.
/// * `Game.ConsoleLogger`: implements `ILogger`, marked parameterless constructor.
/// * `Game.Clock`: marked parameterless constructor, `ticks: int`.
/// * `Game.Engine`: marked constructor `(logger: ILogger, clock: Clock)` storing
///   into public fields of the same names.
/// * `Game.Player`: marked parameterless constructor and a marked `logger` field.
/// * `Game.Main`: static `Run()` printing a fresh clock's ticks.
///
/// Four factories (ConsoleLogger, Clock, Engine, Player) and one injector (Player).
pub fn game_module() -> Module {
    let engine_ctor = MethodBuilder::assigning_constructor(
        "Game.Engine",
        &[("logger", "Game.ILogger"), ("clock", "Game.Clock")],
    )
    .inject()
    .build();

    let clock_ctor = MethodBuilder::constructor().inject().instr(Instr::Return).build();
    let clock_ctor_id = clock_ctor.id;

    ModuleBuilder::new("Game")
        .references_runtime()
        .ty(TypeBuilder::interface("Game.ILogger").build())
        .ty(TypeBuilder::class("Game.ConsoleLogger")
            .implements("Game.ILogger")
            .constructor(MethodBuilder::constructor().inject().instr(Instr::Return).build())
            .build())
        .ty(TypeBuilder::class("Game.Clock")
            .field(FieldBuilder::new("ticks", "int").visibility(Visibility::Public).build())
            .constructor(clock_ctor)
            .build())
        .ty(TypeBuilder::class("Game.Engine")
            .field(FieldBuilder::new("logger", "Game.ILogger").visibility(Visibility::Public).build())
            .field(FieldBuilder::new("clock", "Game.Clock").visibility(Visibility::Public).build())
            .constructor(engine_ctor)
            .build())
        .ty(TypeBuilder::class("Game.Player")
            .inject_field("logger", "Game.ILogger")
            .field(FieldBuilder::new("score", "int").build())
            .constructor(MethodBuilder::constructor().inject().instr(Instr::Return).build())
            .build())
        .ty(TypeBuilder::class("Game.Main")
            .method(MethodBuilder::static_method("Run")
                .public()
                .body(vec![
                    Instr::NewObj { owner: "Game.Clock".into(), ctor: clock_ctor_id },
                    Instr::LoadField { owner: "Game.Clock".into(), field: "ticks".into() },
                    Instr::Print,
                    Instr::LoadConst(Const::Str("done".into())),
                    Instr::Print,
                    Instr::Return,
                ])
                .build())
            .build())
        .build()
}

/// `game_module()` woven with default options.
pub fn woven_game() -> Module {
    let mut module = game_module();
    let outcome = weave_module(&mut module, &WeaveOptions::default()).unwrap();
    assert!(matches!(outcome, WeaveOutcome::Woven(_)), "{outcome:?}");
    module
}

pub fn player_host() -> Rc<Host> {
    Host::new(HostConfig::default())
}

/// A host with the woven Game module loaded.
pub fn game_host() -> Rc<Host> {
    let host = player_host();
    host.load(woven_game()).unwrap();
    host
}

/// Save `module` as an artifact file in `dir`.
pub fn write_artifact(dir: &Path, file_name: &str, module: Module) -> PathBuf {
    let path = dir.join(file_name);
    Artifact::new(module).save(&path).unwrap();
    path
}

pub fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
