#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use prewire::binary::{Artifact, is_artifact, read_symbols_only};
use prewire::weave::{WeaveOptions, weave_module};

#[derive(Arbitrary, Debug)]
struct Input {
    /// Prepend a well-formed header so the section decoders get exercised.
    with_header: bool,
    symbols_len: u16,
    body: Vec<u8>,
}

impl Input {
    fn bytes(&self) -> Vec<u8> {
        if !self.with_header {
            return self.body.clone();
        }
        let symbols_len = (self.symbols_len as usize).min(self.body.len());
        let mut buf = Vec::with_capacity(24 + self.body.len());
        buf.extend_from_slice(b"PWMD");
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&(20 + symbols_len as u32).to_le_bytes());
        buf.extend_from_slice(&(symbols_len as u32).to_le_bytes());
        buf.extend_from_slice(&self.body[..symbols_len]);
        let rest = &self.body[symbols_len..];
        buf.extend_from_slice(&(rest.len() as u32).to_le_bytes());
        buf.extend_from_slice(rest);
        buf
    }
}

fuzz_target!(|input: Input| {
    let data = input.bytes();
    let _ = is_artifact(&data);
    let _ = read_symbols_only(&data);

    let Ok(artifact) = Artifact::from_bytes(&data) else { return };
    let Ok(bytes) = artifact.to_bytes() else { return };
    let reread = Artifact::from_bytes(&bytes).expect("re-encoded artifact must decode");
    assert_eq!(reread.module, artifact.module);

    // Weaving arbitrary IR must either succeed or report an error.
    let mut module = artifact.module;
    if weave_module(&mut module, &WeaveOptions::default()).is_ok() {
        let woven = Artifact::new(module).to_bytes().expect("woven module must encode");
        Artifact::from_bytes(&woven).expect("woven artifact must decode");
    }
});
