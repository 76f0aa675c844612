use bevy::prelude::*;
use std::collections::HashSet;

use crate::components::Horizontal;
use crate::config::KeyBindings;

/// Raw key codes held this frame and those that went down this frame.
/// Keyboard (windowed) and scripted drivers (headless, tests) both write to this.
#[derive(Resource, Default, Clone, Debug)]
pub struct InputState {
    pub active: HashSet<String>,
    pub just_pressed: HashSet<String>,
}

impl InputState {
    pub fn pressed(&self, key: &str) -> bool {
        self.active.contains(key)
    }

    pub fn just_pressed(&self, key: &str) -> bool {
        self.just_pressed.contains(key)
    }

    pub fn press(&mut self, key: &str) {
        if self.active.insert(key.to_string()) {
            self.just_pressed.insert(key.to_string());
        }
    }

    pub fn release(&mut self, key: &str) {
        self.active.remove(key);
        self.just_pressed.remove(key);
    }

    pub fn any_pressed(&self, keys: &[String]) -> bool {
        keys.iter().any(|k| self.pressed(k))
    }

    pub fn any_just_pressed(&self, keys: &[String]) -> bool {
        keys.iter().any(|k| self.just_pressed(k))
    }

    /// Replaces the held set, deriving the down edges from the previous one.
    pub fn advance(&mut self, held: &HashSet<String>) {
        self.just_pressed = held.difference(&self.active).cloned().collect();
        self.active = held.clone();
    }

    pub fn clear_frame(&mut self) {
        self.just_pressed.clear();
    }

    /// Left and right together cancel out.
    pub fn horizontal(&self, bindings: &KeyBindings) -> Horizontal {
        let left = self.any_pressed(&bindings.move_left);
        let right = self.any_pressed(&bindings.move_right);
        match (left, right) {
            (true, false) => Horizontal::Left,
            (false, true) => Horizontal::Right,
            _ => Horizontal::None,
        }
    }

    pub fn jump_pressed(&self, bindings: &KeyBindings) -> bool {
        self.any_just_pressed(&bindings.jump)
    }

    /// Sum of the held shoot keys (up, down, left, right). `None` when nothing
    /// is held or the keys cancel out.
    pub fn shoot_direction(&self, bindings: &KeyBindings) -> Option<Vec2> {
        let [up, down, left, right] = &bindings.shoot;
        let mut dir = Vec2::ZERO;
        if self.pressed(up) {
            dir.y -= 1.0;
        }
        if self.pressed(down) {
            dir.y += 1.0;
        }
        if self.pressed(left) {
            dir.x -= 1.0;
        }
        if self.pressed(right) {
            dir.x += 1.0;
        }
        (dir != Vec2::ZERO).then_some(dir)
    }
}

/// Keys currently held down, as raw codes. The runtime turns this into an
/// `InputState` once per frame.
#[derive(Resource, Default, Clone, Debug)]
pub struct HeldKeys(pub HashSet<String>);

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(HeldKeys::default()).add_systems(
            PreUpdate,
            keyboard_to_held_keys.run_if(resource_exists::<ButtonInput<KeyCode>>),
        );
    }
}

/// `KeyCode` debug names match the DOM-style codes used in key bindings.
fn keyboard_to_held_keys(keyboard: Res<ButtonInput<KeyCode>>, mut held: ResMut<HeldKeys>) {
    held.0 = keyboard.get_pressed().map(|code| format!("{code:?}")).collect();
}
