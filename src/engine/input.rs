use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::simulation::ControlInput;

/// A drivable control, independent of the key bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Accelerate,
    Brake,
    Boost,
    SteerLeft,
    SteerRight,
}

impl Control {
    /// Keyboard binding: arrows or WASD drive, Space boosts, Shift brakes.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowUp" | "w" | "W" => Some(Control::Accelerate),
            "ArrowDown" | "s" | "S" | "Shift" => Some(Control::Brake),
            " " | "Space" => Some(Control::Boost),
            "ArrowLeft" | "a" | "A" => Some(Control::SteerLeft),
            "ArrowRight" | "d" | "D" => Some(Control::SteerRight),
            _ => None,
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Control::Accelerate => "accelerate",
            Control::Brake => "brake",
            Control::Boost => "boost",
            Control::SteerLeft => "steer-left",
            Control::SteerRight => "steer-right",
        };
        f.write_str(name)
    }
}

impl FromStr for Control {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accelerate" | "up" => Ok(Control::Accelerate),
            "brake" | "down" => Ok(Control::Brake),
            "boost" => Ok(Control::Boost),
            "steer-left" | "left" => Ok(Control::SteerLeft),
            "steer-right" | "right" => Ok(Control::SteerRight),
            other => Err(format!("unknown control '{other}'")),
        }
    }
}

/// Held controls, written by input events and read once per tick.
///
/// Key events are tracked per physical key, so releasing one of several keys
/// bound to the same control leaves the control held.
#[derive(Debug, Clone, Default)]
pub struct InputBuffer {
    held: ControlInput,
    keys: HashSet<String>,
}

impl InputBuffer {
    pub fn press(&mut self, control: Control) {
        set_control(&mut self.held, control, true);
    }

    pub fn release(&mut self, control: Control) {
        set_control(&mut self.held, control, false);
    }

    /// Returns false for keys without a binding.
    pub fn key_down(&mut self, key: &str) -> bool {
        if Control::from_key(key).is_none() {
            return false;
        }
        self.keys.insert(key.to_string());
        true
    }

    pub fn key_up(&mut self, key: &str) {
        self.keys.remove(key);
    }

    pub fn clear(&mut self) {
        self.held = ControlInput::default();
        self.keys.clear();
    }

    pub fn controls(&self) -> ControlInput {
        let mut input = self.held;
        for control in self.keys.iter().filter_map(|key| Control::from_key(key)) {
            set_control(&mut input, control, true);
        }
        input
    }
}

fn set_control(input: &mut ControlInput, control: Control, down: bool) {
    match control {
        Control::Accelerate => input.accelerate = down,
        Control::Brake => input.brake = down,
        Control::Boost => input.boost = down,
        Control::SteerLeft => input.steer_left = down,
        Control::SteerRight => input.steer_right = down,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_bindings() {
        assert_eq!(Control::from_key("ArrowUp"), Some(Control::Accelerate));
        assert_eq!(Control::from_key("Shift"), Some(Control::Brake));
        assert_eq!(Control::from_key(" "), Some(Control::Boost));
        assert_eq!(Control::from_key("Escape"), None);
        assert_eq!("steer-left".parse::<Control>(), Ok(Control::SteerLeft));
    }

    #[test]
    fn press_and_release() {
        let mut input = InputBuffer::default();
        input.press(Control::Accelerate);
        input.press(Control::SteerRight);
        input.release(Control::Accelerate);

        let held = input.controls();
        assert!(!held.accelerate);
        assert!(held.steer_right);
    }

    #[test]
    fn shared_binding_stays_held_until_every_key_is_up() {
        let mut input = InputBuffer::default();
        assert!(input.key_down("ArrowDown"));
        assert!(input.key_down("s"));
        assert!(!input.key_down("Escape"));

        input.key_up("s");
        assert!(input.controls().brake);

        // Repeated key-down from auto-repeat is idempotent
        input.key_down("ArrowDown");
        input.key_up("ArrowDown");
        assert!(!input.controls().brake);
    }
}
