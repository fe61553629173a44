/*
 *  tests/dispatch_integration.rs
 *
 *  Integration tests for the dispatch pipeline
 *
 *  vdpau-dispatch - VDPAU driver dispatch shim
 *  (c) 2024-26 vdpau-dispatch contributors
 */

//! End-to-end scenarios over scripted loader doubles: which paths get
//! opened, in what order symbols are resolved and the trace setter runs,
//! and that arguments and statuses pass through the shim verbatim.

use std::cell::RefCell;
use std::ffi::c_void;
use std::os::raw::c_int;

use vdpau::ffi::symbol_str;
use vdpau::{
    DispatchConfig, Display, Dri2Probe, Dri2Unavailable, LoadedModule, ModuleLoader,
    RawModuleHandle, VdpDevice, VdpDeviceCreateX11, VdpGetProcAddress, VdpStatus,
    VdpTraceSetHandle, create_device,
};

const MODULE_DIR: &str = "/usr/lib/vdpau";

// Everything in one dispatch call happens on the calling thread, so a
// thread-local event log keeps parallel tests isolated from each other.
thread_local! {
    static EVENTS: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

fn record(event: String) {
    EVENTS.with(|events| events.borrow_mut().push(event));
}

fn take_events() -> Vec<String> {
    EVENTS.with(|events| events.take())
}

/// What a scripted module hands out when asked.
#[derive(Clone, Copy)]
struct ModuleSpec {
    create: Option<VdpDeviceCreateX11>,
    setter: Option<VdpTraceSetHandle>,
    raw: *mut c_void,
}

impl ModuleSpec {
    fn backend(create: Option<VdpDeviceCreateX11>) -> Self {
        Self {
            create,
            setter: None,
            raw: 0xbac0 as *mut c_void,
        }
    }

    fn trace(create: Option<VdpDeviceCreateX11>, setter: Option<VdpTraceSetHandle>) -> Self {
        Self {
            create,
            setter,
            raw: 0x7ace as *mut c_void,
        }
    }
}

struct FakeModule {
    spec: ModuleSpec,
}

impl LoadedModule for FakeModule {
    fn device_create_entry(&self, symbol: &[u8]) -> Option<VdpDeviceCreateX11> {
        record(format!("resolve {}", symbol_str(symbol)));
        self.spec.create
    }

    fn handle_setter(&self, symbol: &[u8]) -> Option<VdpTraceSetHandle> {
        record(format!("resolve {}", symbol_str(symbol)));
        self.spec.setter
    }

    fn into_raw_handle(self: Box<Self>) -> RawModuleHandle {
        RawModuleHandle::from_raw(self.spec.raw)
    }
}

/// Loader double: opens only the scripted paths, records every attempt.
struct ScriptedLoader {
    modules: Vec<(String, ModuleSpec)>,
    attempts: RefCell<Vec<String>>,
}

impl ScriptedLoader {
    fn new(modules: Vec<(String, ModuleSpec)>) -> Self {
        Self {
            modules,
            attempts: RefCell::new(Vec::new()),
        }
    }

    fn attempts(&self) -> Vec<String> {
        self.attempts.borrow().clone()
    }
}

impl ModuleLoader for ScriptedLoader {
    fn open(&self, path: &str) -> Result<Box<dyn LoadedModule>, String> {
        self.attempts.borrow_mut().push(path.to_string());
        match self.modules.iter().find(|(scripted, _)| scripted == path) {
            Some((_, spec)) => Ok(Box::new(FakeModule { spec: *spec })),
            None => Err(format!("{path}: cannot open shared object file")),
        }
    }
}

/// Probe that fails the test if resolution ever consults it.
struct PanicProbe;

impl Dri2Probe for PanicProbe {
    fn extension_present(&self) -> bool {
        panic!("autodetection must not be queried when the override is set");
    }

    fn protocol_version(&self) -> Option<(u32, u32)> {
        panic!("autodetection must not be queried when the override is set");
    }

    fn driver_name(&self, _screen: usize) -> Option<String> {
        panic!("autodetection must not be queried when the override is set");
    }
}

unsafe extern "C" fn backend_create(
    display: *mut Display,
    screen: c_int,
    device: *mut VdpDevice,
    get_proc_address: *mut Option<VdpGetProcAddress>,
) -> VdpStatus {
    record(format!(
        "backend create display={display:p} screen={screen} device={device:p} gpa={get_proc_address:p}"
    ));
    VdpStatus::OK
}

unsafe extern "C" fn preempted_create(
    _display: *mut Display,
    _screen: c_int,
    _device: *mut VdpDevice,
    _get_proc_address: *mut Option<VdpGetProcAddress>,
) -> VdpStatus {
    record("backend create".to_string());
    VdpStatus::DISPLAY_PREEMPTED
}

unsafe extern "C" fn trace_create(
    _display: *mut Display,
    _screen: c_int,
    _device: *mut VdpDevice,
    _get_proc_address: *mut Option<VdpGetProcAddress>,
) -> VdpStatus {
    record("trace create".to_string());
    VdpStatus::OK
}

unsafe extern "C" fn trace_set_backend(handle: RawModuleHandle) {
    record(format!("set_backend_handle {handle:?}"));
}

fn config(driver_override: Option<&str>, trace_enabled: bool) -> DispatchConfig {
    DispatchConfig {
        driver_override: driver_override.map(String::from),
        module_dir: MODULE_DIR.into(),
        trace_enabled,
    }
}

fn run(
    config: &DispatchConfig,
    probe: &dyn Dri2Probe,
    loader: &ScriptedLoader,
    screen: c_int,
) -> VdpStatus {
    let display = 0x0d15 as *mut Display;
    let mut device: VdpDevice = 0;
    let mut get_proc_address: Option<VdpGetProcAddress> = None;
    unsafe {
        create_device(
            config,
            probe,
            loader,
            display,
            screen,
            &mut device,
            &mut get_proc_address,
        )
    }
}

#[test]
fn scenario_a_override_primary_path() {
    take_events();
    let loader = ScriptedLoader::new(vec![(
        format!("{MODULE_DIR}/libvdpau_acme.so.1"),
        ModuleSpec::backend(Some(backend_create)),
    )]);

    let display = 0x0d15 as *mut Display;
    let mut device: VdpDevice = 0;
    let mut get_proc_address: Option<VdpGetProcAddress> = None;
    let device_ptr: *mut VdpDevice = &mut device;
    let gpa_ptr: *mut Option<VdpGetProcAddress> = &mut get_proc_address;

    let status = unsafe {
        create_device(
            &config(Some("acme"), false),
            &PanicProbe,
            &loader,
            display,
            3,
            device_ptr,
            gpa_ptr,
        )
    };

    assert_eq!(status, VdpStatus::OK);
    assert_eq!(loader.attempts(), vec![format!("{MODULE_DIR}/libvdpau_acme.so.1")]);
    assert_eq!(
        take_events(),
        vec![
            "resolve vdp_imp_device_create_x11".to_string(),
            format!(
                "backend create display={display:p} screen=3 device={device_ptr:p} gpa={gpa_ptr:p}"
            ),
        ]
    );
}

#[test]
fn scenario_b_default_driver_via_fallback_name() {
    take_events();
    // Only the old bare-name layout has the library installed.
    let loader = ScriptedLoader::new(vec![(
        "libvdpau_nvidia.so".to_string(),
        ModuleSpec::backend(Some(backend_create)),
    )]);

    let status = run(&config(None, false), &Dri2Unavailable, &loader, 0);

    assert_eq!(status, VdpStatus::OK);
    assert_eq!(
        loader.attempts(),
        vec![
            format!("{MODULE_DIR}/libvdpau_nvidia.so.1"),
            "libvdpau_nvidia.so".to_string(),
        ]
    );
}

#[test]
fn scenario_c_trace_chaining_order() {
    take_events();
    let loader = ScriptedLoader::new(vec![
        (
            format!("{MODULE_DIR}/libvdpau_acme.so.1"),
            ModuleSpec::backend(Some(backend_create)),
        ),
        (
            format!("{MODULE_DIR}/libvdpau_trace.so.1"),
            ModuleSpec::trace(Some(trace_create), Some(trace_set_backend)),
        ),
    ]);

    let status = run(&config(Some("acme"), true), &PanicProbe, &loader, 0);
    assert_eq!(status, VdpStatus::OK);

    let backend_handle = RawModuleHandle::from_raw(0xbac0 as *mut c_void);
    let events = take_events();
    assert_eq!(
        events,
        vec![
            "resolve vdp_trace_set_backend_handle".to_string(),
            format!("set_backend_handle {backend_handle:?}"),
            "resolve vdp_trace_device_create_x11".to_string(),
            "trace create".to_string(),
        ]
    );
    // The backend's own entry point is never resolved once the trace
    // module is in front.
    assert!(!events.iter().any(|e| e.contains("vdp_imp_device_create_x11")));
}

#[test]
fn scenario_d_both_load_attempts_fail() {
    take_events();
    let loader = ScriptedLoader::new(Vec::new());

    let status = run(&config(Some("missing"), false), &PanicProbe, &loader, 0);

    assert_eq!(status, VdpStatus::NO_IMPLEMENTATION);
    // Exactly one fallback attempt after the primary failure, no more.
    assert_eq!(
        loader.attempts(),
        vec![
            format!("{MODULE_DIR}/libvdpau_missing.so.1"),
            "libvdpau_missing.so".to_string(),
        ]
    );
    // No symbol resolution was ever attempted.
    assert!(take_events().is_empty());
}

#[test]
fn overflowing_driver_name_skips_loading_entirely() {
    take_events();
    let loader = ScriptedLoader::new(Vec::new());
    let huge = "x".repeat(8192);

    let status = run(&config(Some(&huge), false), &PanicProbe, &loader, 0);

    assert_eq!(status, VdpStatus::NO_IMPLEMENTATION);
    assert!(loader.attempts().is_empty());
}

#[test]
fn trace_library_missing_fails_the_call() {
    take_events();
    let loader = ScriptedLoader::new(vec![(
        format!("{MODULE_DIR}/libvdpau_acme.so.1"),
        ModuleSpec::backend(Some(backend_create)),
    )]);

    let status = run(&config(Some("acme"), true), &PanicProbe, &loader, 0);

    assert_eq!(status, VdpStatus::NO_IMPLEMENTATION);
    assert_eq!(
        loader.attempts(),
        vec![
            format!("{MODULE_DIR}/libvdpau_acme.so.1"),
            format!("{MODULE_DIR}/libvdpau_trace.so.1"),
        ]
    );
    // The backend is never dispatched around the failed interposer.
    assert!(take_events().is_empty());
}

#[test]
fn trace_without_setter_is_incompatible() {
    take_events();
    let loader = ScriptedLoader::new(vec![
        (
            format!("{MODULE_DIR}/libvdpau_acme.so.1"),
            ModuleSpec::backend(Some(backend_create)),
        ),
        (
            format!("{MODULE_DIR}/libvdpau_trace.so.1"),
            ModuleSpec::trace(Some(trace_create), None),
        ),
    ]);

    let status = run(&config(Some("acme"), true), &PanicProbe, &loader, 0);

    assert_eq!(status, VdpStatus::NO_IMPLEMENTATION);
    assert_eq!(
        take_events(),
        vec!["resolve vdp_trace_set_backend_handle".to_string()]
    );
}

#[test]
fn backend_without_entry_point_fails() {
    take_events();
    let loader = ScriptedLoader::new(vec![(
        format!("{MODULE_DIR}/libvdpau_acme.so.1"),
        ModuleSpec::backend(None),
    )]);

    let status = run(&config(Some("acme"), false), &PanicProbe, &loader, 0);

    assert_eq!(status, VdpStatus::NO_IMPLEMENTATION);
    assert_eq!(
        take_events(),
        vec!["resolve vdp_imp_device_create_x11".to_string()]
    );
}

#[test]
fn backend_status_passes_through_verbatim() {
    take_events();
    let loader = ScriptedLoader::new(vec![(
        format!("{MODULE_DIR}/libvdpau_acme.so.1"),
        ModuleSpec::backend(Some(preempted_create)),
    )]);

    let status = run(&config(Some("acme"), false), &PanicProbe, &loader, 0);
    assert_eq!(status, VdpStatus::DISPLAY_PREEMPTED);
    take_events();
}
