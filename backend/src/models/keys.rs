use platforms::input::KeyKind;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

macro_rules! key_bindings {
    ($($key:ident),+ $(,)?) => {
        /// A persisted key binding mirroring [`KeyKind`].
        #[derive(
            Clone, Copy, PartialEq, Eq, Hash, Default, Debug, Serialize, Deserialize, Display,
            EnumString, EnumIter,
        )]
        pub enum KeyBinding {
            #[default]
            $($key),+
        }

        impl From<KeyBinding> for KeyKind {
            fn from(value: KeyBinding) -> Self {
                match value {
                    $(KeyBinding::$key => KeyKind::$key),+
                }
            }
        }
    };
}

key_bindings!(
    A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S, T, U, V, W, X, Y, Z, Zero, One, Two,
    Three, Four, Five, Six, Seven, Eight, Nine, F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,
    Up, Down, Left, Right, Enter, Esc, Space, Tab, Shift, Ctrl, Alt, Backspace,
);

/// Key bindings the controller presses directly rather than through slots.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct KeyBindings {
    #[serde(default = "forward_key_default")]
    pub forward: KeyBinding,
    #[serde(default = "jump_key_default")]
    pub jump: KeyBinding,
    #[serde(default = "strafe_left_key_default")]
    pub strafe_left: KeyBinding,
    #[serde(default = "strafe_right_key_default")]
    pub strafe_right: KeyBinding,
    #[serde(default = "rotate_left_key_default")]
    pub rotate_left: KeyBinding,
    #[serde(default = "rotate_right_key_default")]
    pub rotate_right: KeyBinding,
    #[serde(default = "look_up_key_default")]
    pub look_up: KeyBinding,
    #[serde(default = "look_down_key_default")]
    pub look_down: KeyBinding,
    #[serde(default = "cancel_key_default")]
    pub cancel: KeyBinding,
    #[serde(default = "confirm_key_default")]
    pub confirm: KeyBinding,
    #[serde(default = "pick_key_default")]
    pub pick: KeyBinding,
    /// Toggles the own resource panel.
    #[serde(default = "panel_key_default")]
    pub panel: KeyBinding,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: forward_key_default(),
            jump: jump_key_default(),
            strafe_left: strafe_left_key_default(),
            strafe_right: strafe_right_key_default(),
            rotate_left: rotate_left_key_default(),
            rotate_right: rotate_right_key_default(),
            look_up: look_up_key_default(),
            look_down: look_down_key_default(),
            cancel: cancel_key_default(),
            confirm: confirm_key_default(),
            pick: pick_key_default(),
            panel: panel_key_default(),
        }
    }
}

fn forward_key_default() -> KeyBinding {
    KeyBinding::W
}

fn jump_key_default() -> KeyBinding {
    KeyBinding::Space
}

fn strafe_left_key_default() -> KeyBinding {
    KeyBinding::A
}

fn strafe_right_key_default() -> KeyBinding {
    KeyBinding::D
}

fn rotate_left_key_default() -> KeyBinding {
    KeyBinding::Left
}

fn rotate_right_key_default() -> KeyBinding {
    KeyBinding::Right
}

fn look_up_key_default() -> KeyBinding {
    KeyBinding::Up
}

fn look_down_key_default() -> KeyBinding {
    KeyBinding::Down
}

fn cancel_key_default() -> KeyBinding {
    KeyBinding::Esc
}

fn confirm_key_default() -> KeyBinding {
    KeyBinding::Enter
}

fn pick_key_default() -> KeyBinding {
    KeyBinding::Z
}

fn panel_key_default() -> KeyBinding {
    KeyBinding::T
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn key_binding_parse_and_convert() {
        assert_eq!(KeyBinding::from_str("F3"), Ok(KeyBinding::F3));
        assert_eq!(KeyKind::from(KeyBinding::Esc), KeyKind::Esc);
        assert_eq!(KeyBinding::iter().count(), 60);
    }

    #[test]
    fn key_bindings_missing_fields_use_defaults() {
        let bindings = serde_json::from_str::<KeyBindings>(r#"{ "pick": "X" }"#).unwrap();

        assert_eq!(bindings.pick, KeyBinding::X);
        assert_eq!(bindings.panel, KeyBinding::T);
        assert_eq!(bindings.forward, KeyBinding::W);
    }
}
