use std::fmt;
use std::str::FromStr;

/// Keys the runner knows how to name, inject and watch for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtualKey {
    Return,
    Escape,
    Space,
    Tab,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
    F(u8),
}

impl VirtualKey {
    /// Win32 virtual-key code.
    pub fn win_vk(self) -> u16 {
        match self {
            VirtualKey::Return => 0x0D,
            VirtualKey::Escape => 0x1B,
            VirtualKey::Space => 0x20,
            VirtualKey::Tab => 0x09,
            VirtualKey::PageUp => 0x21,
            VirtualKey::PageDown => 0x22,
            VirtualKey::End => 0x23,
            VirtualKey::Home => 0x24,
            VirtualKey::Left => 0x25,
            VirtualKey::Up => 0x26,
            VirtualKey::Right => 0x27,
            VirtualKey::Down => 0x28,
            // VK_F1 = 0x70 .. VK_F24 = 0x87
            VirtualKey::F(n) => 0x70 + u16::from(n.clamp(1, 24)) - 1,
        }
    }

    /// macOS virtual keycode (kVK_*). Function keys past F20 have none.
    pub fn mac_keycode(self) -> Option<u16> {
        let code = match self {
            VirtualKey::Return => 36,
            VirtualKey::Escape => 53,
            VirtualKey::Space => 49,
            VirtualKey::Tab => 48,
            VirtualKey::PageUp => 116,
            VirtualKey::PageDown => 121,
            VirtualKey::Home => 115,
            VirtualKey::End => 119,
            VirtualKey::Left => 123,
            VirtualKey::Right => 124,
            VirtualKey::Down => 125,
            VirtualKey::Up => 126,
            VirtualKey::F(n) => match n {
                1 => 122,
                2 => 120,
                3 => 99,
                4 => 118,
                5 => 96,
                6 => 97,
                7 => 98,
                8 => 100,
                9 => 101,
                10 => 109,
                11 => 103,
                12 => 111,
                13 => 105,
                14 => 107,
                15 => 113,
                16 => 106,
                17 => 64,
                18 => 79,
                19 => 80,
                20 => 90,
                _ => return None,
            },
        };
        Some(code)
    }

    /// The code this platform's keyboard hook reports for the key.
    pub fn native_code(self) -> Option<u32> {
        if cfg!(target_os = "macos") {
            self.mac_keycode().map(u32::from)
        } else {
            Some(u32::from(self.win_vk()))
        }
    }

    /// Navigation keys need the extended-key flag when injected on Windows.
    pub fn is_extended(self) -> bool {
        matches!(
            self,
            VirtualKey::Up
                | VirtualKey::Down
                | VirtualKey::Left
                | VirtualKey::Right
                | VirtualKey::PageUp
                | VirtualKey::PageDown
                | VirtualKey::Home
                | VirtualKey::End
        )
    }
}

impl fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VirtualKey::Return => write!(f, "enter"),
            VirtualKey::Escape => write!(f, "escape"),
            VirtualKey::Space => write!(f, "space"),
            VirtualKey::Tab => write!(f, "tab"),
            VirtualKey::Up => write!(f, "up"),
            VirtualKey::Down => write!(f, "down"),
            VirtualKey::Left => write!(f, "left"),
            VirtualKey::Right => write!(f, "right"),
            VirtualKey::PageUp => write!(f, "pageup"),
            VirtualKey::PageDown => write!(f, "pagedown"),
            VirtualKey::Home => write!(f, "home"),
            VirtualKey::End => write!(f, "end"),
            VirtualKey::F(n) => write!(f, "f{n}"),
        }
    }
}

impl FromStr for VirtualKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        let key = match lowered.as_str() {
            "enter" | "return" => VirtualKey::Return,
            "esc" | "escape" => VirtualKey::Escape,
            "space" => VirtualKey::Space,
            "tab" => VirtualKey::Tab,
            "up" => VirtualKey::Up,
            "down" => VirtualKey::Down,
            "left" => VirtualKey::Left,
            "right" => VirtualKey::Right,
            "pageup" | "pgup" => VirtualKey::PageUp,
            "pagedown" | "pgdn" => VirtualKey::PageDown,
            "home" => VirtualKey::Home,
            "end" => VirtualKey::End,
            other => match other.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
                Some(n) if (1..=24).contains(&n) => VirtualKey::F(n),
                _ => return Err(format!("unknown key: {value}")),
            },
        };
        Ok(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Down,
    Up,
}

/// A key transition observed by the global hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Platform code as reported by the hook (Win32 VK or macOS keycode).
    pub code: u32,
    pub direction: KeyDirection,
}

impl KeyEvent {
    pub fn new(code: u32, direction: KeyDirection) -> Self {
        Self { code, direction }
    }

    pub fn is_press_of(&self, key: VirtualKey) -> bool {
        self.direction == KeyDirection::Down && key.native_code() == Some(self.code)
    }
}
