// Weaving a module with N constructor-injectable and M field-injectable types
// must register exactly N factories and M injectors when the host loads it.

use proptest::prelude::*;

use prewire::ir::builder::{FieldBuilder, MethodBuilder, ModuleBuilder, TypeBuilder};
use prewire::ir::{Instr, Module};
use prewire::runtime::{Host, HostConfig};
use prewire::weave::{WeaveOptions, WeaveOutcome, weave_module};

/// `ctor_only` types with a marked constructor, `field_only` types with
/// `fields_each` marked fields, `both` types with both, and `plain` types
/// with neither.
fn module(ctor_only: usize, field_only: usize, both: usize, plain: usize, fields_each: usize) -> Module {
    let mut b = ModuleBuilder::new("P").references_runtime();
    let marked_ctor = || MethodBuilder::constructor().inject().instr(Instr::Return).build();
    let with_fields = |mut t: TypeBuilder| {
        for f in 0..fields_each {
            t = t.inject_field(&format!("dep{f}"), "P.Dep");
        }
        t
    };

    for i in 0..ctor_only {
        b = b.ty(TypeBuilder::class(format!("P.Ctor{i}")).constructor(marked_ctor()).build());
    }
    for i in 0..field_only {
        b = b.ty(with_fields(TypeBuilder::class(format!("P.Field{i}"))).build());
    }
    for i in 0..both {
        b = b.ty(with_fields(TypeBuilder::class(format!("P.Both{i}"))).constructor(marked_ctor()).build());
    }
    for i in 0..plain {
        b = b.ty(TypeBuilder::class(format!("P.Plain{i}"))
            .field(FieldBuilder::new("x", "int").build())
            .constructor(MethodBuilder::constructor().build())
            .build());
    }
    b.build()
}

#[test]
fn prop_registrations_match_marked_types() {
    proptest!(|(
        ctor_only in 0usize..6,
        field_only in 0usize..6,
        both in 0usize..4,
        plain in 0usize..4,
        fields_each in 1usize..4,
    )| {
        let mut m = module(ctor_only, field_only, both, plain, fields_each);
        let outcome = weave_module(&mut m, &WeaveOptions::default()).unwrap();

        let factories = ctor_only + both;
        let injectors = field_only + both;
        if factories + injectors == 0 {
            prop_assert_eq!(outcome, WeaveOutcome::NothingToWeave);
            return Ok(());
        }
        prop_assert!(matches!(outcome, WeaveOutcome::Woven(_)));

        let host = Host::new(HostConfig::default());
        let report = host.load(m).unwrap();
        prop_assert_eq!(report.hooks_run, 1);
        prop_assert_eq!(report.factories, factories);
        prop_assert_eq!(report.injectors, injectors);
        prop_assert_eq!(host.registry().factory_count(), factories);
        prop_assert_eq!(host.registry().injector_count(), injectors);
    });
}

#[test]
fn prop_weaving_is_idempotent() {
    proptest!(|(ctor_only in 0usize..4, field_only in 0usize..4, both in 0usize..3)| {
        let mut m = module(ctor_only, field_only, both, 1, 1);
        weave_module(&mut m, &WeaveOptions::default()).unwrap();
        let once = m.clone();
        let again = weave_module(&mut m, &WeaveOptions::default()).unwrap();
        prop_assert!(!matches!(again, WeaveOutcome::Woven(_)));
        prop_assert_eq!(m, once);
    });
}
