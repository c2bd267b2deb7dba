//! Win32 backend: SendInput, GetForegroundWindow and a WH_KEYBOARD_LL hook
//! pumped by GetMessage.

use std::cell::RefCell;
use std::mem;

use tracing::warn;
use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
    MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEINPUT, MOUSE_EVENT_FLAGS, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetForegroundWindow, GetMessageW, PeekMessageW,
    PostThreadMessageW, SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, HC_ACTION,
    HHOOK, KBDLLHOOKSTRUCT, MSG, PM_NOREMOVE, WH_KEYBOARD_LL, WM_KEYDOWN, WM_KEYUP, WM_QUIT,
    WM_SYSKEYDOWN, WM_SYSKEYUP,
};

use crate::runner::error::{HookError, InjectError};
use crate::runner::foreground::WindowId;
use crate::runner::hotkey::{KeyEventPump, KeySink, PumpQuit, ReadySender};
use crate::runner::input::MouseButton;
use crate::runner::key_event::{KeyDirection, KeyEvent, VirtualKey};

use super::SystemKeyPump;

fn keyboard_input(vk: VIRTUAL_KEY, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn mouse_input(flags: MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx: 0,
                dy: 0,
                mouseData: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn send_inputs(inputs: &[INPUT]) -> Result<(), InjectError> {
    // SAFETY: every INPUT is fully initialised and cbsize matches the struct.
    let sent = unsafe { SendInput(inputs, mem::size_of::<INPUT>() as i32) };
    let expected = inputs.len() as u32;
    if sent == expected {
        Ok(())
    } else {
        // Typically UIPI refusing input aimed at an elevated window.
        Err(InjectError::Partial { sent, expected })
    }
}

pub fn send_key(key: VirtualKey) -> Result<(), InjectError> {
    let vk = VIRTUAL_KEY(key.win_vk());
    let flags = if key.is_extended() {
        KEYEVENTF_EXTENDEDKEY
    } else {
        KEYBD_EVENT_FLAGS(0)
    };
    send_inputs(&[
        keyboard_input(vk, flags),
        keyboard_input(vk, flags | KEYEVENTF_KEYUP),
    ])
}

pub fn send_clicks(button: MouseButton, count: u8) -> Result<(), InjectError> {
    let (down, up) = match button {
        MouseButton::Left => (MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP),
        MouseButton::Right => (MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP),
    };
    let inputs: Vec<INPUT> = (0..count)
        .flat_map(|_| [mouse_input(down), mouse_input(up)])
        .collect();
    send_inputs(&inputs)
}

pub fn foreground_window() -> Option<WindowId> {
    // SAFETY: no arguments; returns a null HWND when nothing has focus.
    let hwnd = unsafe { GetForegroundWindow() };
    if hwnd.0.is_null() {
        None
    } else {
        Some(WindowId(hwnd.0 as usize as u64))
    }
}

thread_local! {
    // Low-level hook callbacks run on the installing thread, inside GetMessage.
    static HOOK_SINK: RefCell<Option<KeySink>> = const { RefCell::new(None) };
}

unsafe extern "system" fn keyboard_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code == HC_ACTION as i32 {
        let direction = match wparam.0 as u32 {
            WM_KEYDOWN | WM_SYSKEYDOWN => Some(KeyDirection::Down),
            WM_KEYUP | WM_SYSKEYUP => Some(KeyDirection::Up),
            _ => None,
        };
        if let Some(direction) = direction {
            // SAFETY: for HC_ACTION, lparam points at a KBDLLHOOKSTRUCT.
            let info = unsafe { &*(lparam.0 as *const KBDLLHOOKSTRUCT) };
            let event = KeyEvent::new(info.vkCode, direction);
            HOOK_SINK.with(|slot| {
                if let Ok(mut slot) = slot.try_borrow_mut() {
                    if let Some(sink) = slot.as_mut() {
                        sink(event);
                    }
                }
            });
        }
    }
    // Always forward; the listener never swallows a keystroke.
    unsafe { CallNextHookEx(HHOOK::default(), code, wparam, lparam) }
}

struct ThreadQuit {
    thread_id: u32,
}

impl PumpQuit for ThreadQuit {
    fn quit(&self) {
        // SAFETY: posting to a thread id; fails harmlessly if the thread is gone.
        let posted = unsafe { PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) };
        if let Err(error) = posted {
            warn!(%error, "failed to post WM_QUIT to hotkey thread");
        }
    }
}

impl KeyEventPump for SystemKeyPump {
    fn run(self: Box<Self>, ready: ReadySender, sink: KeySink) {
        // SAFETY: plain Win32 calls on this thread's own message queue.
        unsafe {
            let thread_id = GetCurrentThreadId();

            // Create the message queue so a WM_QUIT posted right after the
            // handshake is not lost.
            let mut msg = MSG::default();
            let _ = PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_NOREMOVE);

            HOOK_SINK.with(|slot| *slot.borrow_mut() = Some(sink));

            let hook = match SetWindowsHookExW(
                WH_KEYBOARD_LL,
                Some(keyboard_proc),
                HINSTANCE::default(),
                0,
            ) {
                Ok(hook) => hook,
                Err(error) => {
                    HOOK_SINK.with(|slot| slot.borrow_mut().take());
                    let _ = ready.send(Err(HookError::Install(error.to_string())));
                    return;
                }
            };

            if ready.send(Ok(Box::new(ThreadQuit { thread_id }))).is_err() {
                // The launcher timed out and will not quit us; unhook now.
                if let Err(error) = UnhookWindowsHookEx(hook) {
                    warn!(%error, "failed to remove keyboard hook");
                }
                HOOK_SINK.with(|slot| slot.borrow_mut().take());
                return;
            }

            // 0 means WM_QUIT, -1 means the queue is unusable.
            while GetMessageW(&mut msg, HWND::default(), 0, 0).0 > 0 {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }

            if let Err(error) = UnhookWindowsHookEx(hook) {
                warn!(%error, "failed to remove keyboard hook");
            }
            HOOK_SINK.with(|slot| slot.borrow_mut().take());
        }
    }
}
