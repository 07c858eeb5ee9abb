//! Host imports supplied to the template module.
//!
//! Two groups: the `console` log/error sink, forwarded to `tracing`, and a
//! compatibility shim layer for modules built with wasm-bindgen-style glue
//! (randomness hook, reference-drop hook, type-reflection hook, externref
//! table transforms). The shims satisfy linkage and contribute no behavior;
//! the core protocol never depends on them. `__wbindgen_throw` is the one
//! exception: it carries a guest abort message and raises a trap with it.

use crate::abi::EXPORT_MEMORY;
use wasmtime::{Caller, Engine, Extern, Linker};

/// Target for guest diagnostics emitted through the `console` imports
const GUEST_LOG_TARGET: &str = "leafrender_wasm::guest";

/// Per-instance state available to host imports
#[derive(Debug, Clone)]
pub struct HostState {
    /// Module name, attached to forwarded guest diagnostics
    pub module_name: String,
}

impl HostState {
    /// Create host state for a named module
    #[must_use]
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
        }
    }
}

/// Read `(ptr, len)` out of the caller's exported memory as lossy UTF-8.
///
/// Diagnostics must never fail the call, so a missing memory export or an
/// out-of-range pointer decodes to an empty string.
fn read_guest_text(caller: &mut Caller<'_, HostState>, ptr: u32, len: u32) -> String {
    let Some(Extern::Memory(memory)) = caller.get_export(EXPORT_MEMORY) else {
        return String::new();
    };
    let data = memory.data(&caller);
    data.get(ptr as usize..(ptr as u64 + len as u64) as usize)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default()
}

/// Build the linker carrying every import a template module may expect.
///
/// # Errors
///
/// Returns error if an import definition cannot be registered.
pub fn build_linker(engine: &Engine) -> Result<Linker<HostState>, wasmtime::Error> {
    let mut linker: Linker<HostState> = Linker::new(engine);

    linker.func_wrap(
        "console",
        "log",
        |mut caller: Caller<'_, HostState>, ptr: u32, len: u32| {
            let message = read_guest_text(&mut caller, ptr, len);
            let module = caller.data().module_name.clone();
            tracing::debug!(target: GUEST_LOG_TARGET, %module, "{message}");
        },
    )?;

    linker.func_wrap(
        "console",
        "error",
        |mut caller: Caller<'_, HostState>, ptr: u32, len: u32| {
            let message = read_guest_text(&mut caller, ptr, len);
            let module = caller.data().module_name.clone();
            tracing::error!(target: GUEST_LOG_TARGET, %module, "{message}");
        },
    )?;

    // wasm-bindgen placeholder glue. Only the throw hook has behavior: it
    // surfaces the guest's abort message as a trap for this one call.
    linker.func_wrap(
        "__wbindgen_placeholder__",
        "__wbindgen_throw",
        |mut caller: Caller<'_, HostState>, ptr: u32, len: u32| -> Result<(), wasmtime::Error> {
            let message = read_guest_text(&mut caller, ptr, len);
            Err(wasmtime::Error::msg(format!("guest abort: {message}")))
        },
    )?;

    linker.func_wrap(
        "__wbindgen_placeholder__",
        "__wbg_getRandomValues_3d90134a348e46b3",
        |_caller: Caller<'_, HostState>, _obj: u32, _buf: u32| {},
    )?;

    linker.func_wrap(
        "__wbindgen_placeholder__",
        "__wbindgen_object_drop_ref",
        |_caller: Caller<'_, HostState>, _idx: u32| {},
    )?;

    linker.func_wrap(
        "__wbindgen_placeholder__",
        "__wbindgen_describe",
        |_caller: Caller<'_, HostState>, _code: u32| {},
    )?;

    linker.func_wrap(
        "__wbindgen_externref_xform__",
        "__wbindgen_externref_table_grow",
        |_caller: Caller<'_, HostState>, _delta: u32| -> u32 { 0 },
    )?;

    linker.func_wrap(
        "__wbindgen_externref_xform__",
        "__wbindgen_externref_table_set_null",
        |_caller: Caller<'_, HostState>, _idx: u32| {},
    )?;

    linker.func_wrap(
        "__wbindgen_externref_xform__",
        "__wbindgen_externref_table_set",
        |_caller: Caller<'_, HostState>, _idx: u32, _value: u32| -> u32 { 0 },
    )?;

    linker.func_wrap(
        "__wbindgen_externref_xform__",
        "__wbindgen_externref_table_get",
        |_caller: Caller<'_, HostState>, _idx: u32| -> u32 { 0 },
    )?;

    Ok(linker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmtime::Store;

    #[test]
    fn test_host_state_new() {
        let state = HostState::new("leaf_render");
        assert_eq!(state.module_name, "leaf_render");
    }

    #[test]
    fn test_build_linker() {
        let engine = Engine::default();
        assert!(build_linker(&engine).is_ok());
    }

    #[test]
    fn test_console_imports_link() {
        let engine = Engine::default();
        let linker = build_linker(&engine).expect("linker");
        let wat = r#"
            (module
                (import "console" "log" (func $log (param i32 i32)))
                (import "console" "error" (func $err (param i32 i32)))
                (memory (export "memory") 1)
                (func (export "run")
                    (call $log (i32.const 0) (i32.const 0))
                    (call $err (i32.const 0) (i32.const 0))))
        "#;
        let module =
            wasmtime::Module::new(&engine, wat::parse_str(wat).expect("wat")).expect("module");
        let mut store = Store::new(&engine, HostState::new("test"));
        let instance = linker.instantiate(&mut store, &module).expect("instantiate");
        let run = instance
            .get_typed_func::<(), ()>(&mut store, "run")
            .expect("run export");
        run.call(&mut store, ()).expect("guest logging");
    }

    #[test]
    fn test_wbindgen_shims_link_as_noops() {
        let engine = Engine::default();
        let linker = build_linker(&engine).expect("linker");
        let wat = r#"
            (module
                (import "__wbindgen_placeholder__" "__wbindgen_object_drop_ref"
                    (func $drop (param i32)))
                (import "__wbindgen_placeholder__" "__wbindgen_describe"
                    (func $describe (param i32)))
                (import "__wbindgen_externref_xform__" "__wbindgen_externref_table_grow"
                    (func $grow (param i32) (result i32)))
                (memory (export "memory") 1)
                (func (export "run") (result i32)
                    (call $drop (i32.const 1))
                    (call $describe (i32.const 2))
                    (call $grow (i32.const 4))))
        "#;
        let module =
            wasmtime::Module::new(&engine, wat::parse_str(wat).expect("wat")).expect("module");
        let mut store = Store::new(&engine, HostState::new("test"));
        let instance = linker.instantiate(&mut store, &module).expect("instantiate");
        let run = instance
            .get_typed_func::<(), u32>(&mut store, "run")
            .expect("run export");
        assert_eq!(run.call(&mut store, ()).expect("shim calls"), 0);
    }

    #[test]
    fn test_wbindgen_throw_raises_trap_with_message() {
        let engine = Engine::default();
        let linker = build_linker(&engine).expect("linker");
        let wat = r#"
            (module
                (import "__wbindgen_placeholder__" "__wbindgen_throw"
                    (func $throw (param i32 i32)))
                (memory (export "memory") 1)
                (data (i32.const 0) "boom")
                (func (export "run")
                    (call $throw (i32.const 0) (i32.const 4))))
        "#;
        let module =
            wasmtime::Module::new(&engine, wat::parse_str(wat).expect("wat")).expect("module");
        let mut store = Store::new(&engine, HostState::new("test"));
        let instance = linker.instantiate(&mut store, &module).expect("instantiate");
        let run = instance
            .get_typed_func::<(), ()>(&mut store, "run")
            .expect("run export");
        let err = run.call(&mut store, ()).unwrap_err();
        assert!(format!("{err:?}").contains("boom"));
    }
}
