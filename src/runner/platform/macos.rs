//! macOS backend: CGEvent posting, NSWorkspace's frontmost application and a
//! listen-only CGEventTap for the abort key.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use core_foundation::runloop::{
    kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop, CFRunLoopRunResult,
};
use core_graphics::event::{
    CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType,
    CGMouseButton, EventField,
};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use objc2_app_kit::NSWorkspace;

use crate::runner::error::{HookError, InjectError};
use crate::runner::foreground::WindowId;
use crate::runner::hotkey::{KeyEventPump, KeySink, PumpQuit, ReadySender};
use crate::runner::input::MouseButton;
use crate::runner::key_event::{KeyDirection, KeyEvent, VirtualKey};

use super::SystemKeyPump;

fn event_source() -> Result<CGEventSource, InjectError> {
    CGEventSource::new(CGEventSourceStateID::HIDSystemState)
        .map_err(|()| InjectError::Platform("failed to create CGEventSource".to_string()))
}

pub fn send_key(key: VirtualKey) -> Result<(), InjectError> {
    let code = key.mac_keycode().ok_or_else(|| InjectError::UnmappedKey {
        key: key.to_string(),
    })?;
    let source = event_source()?;

    for key_down in [true, false] {
        let event = CGEvent::new_keyboard_event(source.clone(), code, key_down)
            .map_err(|()| InjectError::Platform("failed to create keyboard event".to_string()))?;
        event.post(CGEventTapLocation::HID);
    }
    Ok(())
}

pub fn send_clicks(button: MouseButton, count: u8) -> Result<(), InjectError> {
    let source = event_source()?;
    let location = CGEvent::new(source.clone())
        .map_err(|()| InjectError::Platform("failed to read cursor position".to_string()))?
        .location();

    let (down, up, cg_button) = match button {
        MouseButton::Left => (
            CGEventType::LeftMouseDown,
            CGEventType::LeftMouseUp,
            CGMouseButton::Left,
        ),
        MouseButton::Right => (
            CGEventType::RightMouseDown,
            CGEventType::RightMouseUp,
            CGMouseButton::Right,
        ),
    };

    for click in 1..=count {
        for event_type in [down, up] {
            let event = CGEvent::new_mouse_event(source.clone(), event_type, location, cg_button)
                .map_err(|()| InjectError::Platform("failed to create mouse event".to_string()))?;
            // Click state makes the second click register as a double-click.
            event.set_integer_value_field(EventField::MOUSE_EVENT_CLICK_STATE, i64::from(click));
            event.post(CGEventTapLocation::HID);
        }
    }
    Ok(())
}

pub fn foreground_window() -> Option<WindowId> {
    objc2::rc::autoreleasepool(|_| {
        let workspace = NSWorkspace::sharedWorkspace();
        let frontmost = workspace.frontmostApplication()?;
        let pid = frontmost.processIdentifier();
        (pid > 0).then(|| WindowId(pid as u64))
    })
}

struct RunLoopQuit {
    running: Arc<AtomicBool>,
    run_loop: Arc<Mutex<Option<CFRunLoop>>>,
}

impl PumpQuit for RunLoopQuit {
    fn quit(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Ok(holder) = self.run_loop.lock() {
            if let Some(ref run_loop) = *holder {
                run_loop.stop();
            }
        }
    }
}

impl KeyEventPump for SystemKeyPump {
    fn run(self: Box<Self>, ready: ReadySender, sink: KeySink) {
        let sink = RefCell::new(sink);
        let tap_result = CGEventTap::new(
            CGEventTapLocation::HID,
            CGEventTapPlacement::HeadInsertEventTap,
            CGEventTapOptions::ListenOnly,
            vec![CGEventType::KeyDown, CGEventType::KeyUp],
            move |_proxy, event_type, event| {
                let direction = match event_type {
                    CGEventType::KeyDown => KeyDirection::Down,
                    CGEventType::KeyUp => KeyDirection::Up,
                    _ => return None,
                };
                let code = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE);
                if let Ok(mut sink) = sink.try_borrow_mut() {
                    sink(KeyEvent::new(code as u32, direction));
                }
                // None leaves the event untouched (listen-only tap).
                None
            },
        );

        let tap = match tap_result {
            Ok(tap) => tap,
            Err(()) => {
                let _ = ready.send(Err(HookError::Install(
                    "failed to create event tap; check accessibility permissions".to_string(),
                )));
                return;
            }
        };

        let loop_source = match tap.mach_port.create_runloop_source(0) {
            Ok(source) => source,
            Err(()) => {
                let _ = ready.send(Err(HookError::Install(
                    "failed to create run loop source".to_string(),
                )));
                return;
            }
        };

        let current_run_loop = CFRunLoop::get_current();
        let running = Arc::new(AtomicBool::new(true));
        let run_loop_holder = Arc::new(Mutex::new(Some(current_run_loop.clone())));

        unsafe {
            current_run_loop.add_source(&loop_source, kCFRunLoopCommonModes);
        }
        tap.enable();

        let quit = RunLoopQuit {
            running: Arc::clone(&running),
            run_loop: run_loop_holder,
        };
        if ready.send(Ok(Box::new(quit))).is_err() {
            // The launcher timed out and will not quit us; tear the tap down.
            unsafe {
                current_run_loop.remove_source(&loop_source, kCFRunLoopCommonModes);
            }
            return;
        }

        // kCFRunLoopCommonModes is only for adding sources; run in the
        // default mode, waking periodically to re-check the flag.
        while running.load(Ordering::SeqCst) {
            let result = unsafe {
                CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, Duration::from_millis(100), true)
            };
            if result == CFRunLoopRunResult::Stopped {
                break;
            }
        }

        unsafe {
            current_run_loop.remove_source(&loop_source, kCFRunLoopCommonModes);
        }
    }
}
