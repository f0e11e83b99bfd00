//! Rebuilding the uniform list after a successful link
//!
//! The new list follows the driver's enumeration order. Slots whose name and
//! type survived the relink keep their value; a slot whose type changed is
//! reset to the new type's zero; new names start at zero.

use std::collections::{HashMap, HashSet};

use crate::backend::{value_type_for_gl, GraphicsBackend};
use crate::name::{Name, NameInterner};
use crate::slot::{NamedSlot, ShaderUniform};
use crate::value::ValueType;

/// One active uniform after array expansion
#[derive(Debug, Clone)]
pub(super) struct ActiveSlot {
    pub name: String,
    pub ty: ValueType,
}

/// Element names of a driver-reported uniform.
///
/// Drivers report arrays as `name[0]` (some as plain `name`) with a size; a
/// slot is created per element.
pub(super) fn expand_array(reported: &str, size: u32) -> Vec<String> {
    if size <= 1 {
        return vec![reported.to_string()];
    }
    let base = reported.strip_suffix("[0]").unwrap_or(reported);
    (0..size).map(|i| format!("{base}[{i}]")).collect()
}

/// Active uniforms of a linked program in enumeration order
pub(super) fn active_slots<B: GraphicsBackend>(
    backend: &B,
    program: B::Program,
    label: &str,
) -> Vec<ActiveSlot> {
    let count = backend.active_uniform_count(program);
    let mut slots = Vec::with_capacity(count as usize);

    for index in 0..count {
        let Some(uniform) = backend.active_uniform(program, index) else {
            continue;
        };
        let Some(ty) = value_type_for_gl(uniform.gl_type) else {
            log::warn!(
                "[shader] '{}': skipping uniform '{}' of unsupported type 0x{:04X}",
                label,
                uniform.name,
                uniform.gl_type
            );
            continue;
        };
        slots.extend(
            expand_array(&uniform.name, uniform.size)
                .into_iter()
                .map(|name| ActiveSlot { name, ty }),
        );
    }

    slots
}

/// Merge the previous slots into the new active list.
///
/// Returns the new list and, per slot, whether its value was carried forward.
pub(super) fn merge(
    previous: Vec<ShaderUniform>,
    active: Vec<ActiveSlot>,
    names: &NameInterner,
) -> (Vec<ShaderUniform>, Vec<bool>) {
    let mut old: HashMap<Name, ShaderUniform> = previous
        .into_iter()
        .map(|slot| (slot.name().clone(), slot))
        .collect();

    let mut seen = HashSet::new();
    let mut slots = Vec::with_capacity(active.len());
    let mut carried = Vec::with_capacity(active.len());

    for entry in active {
        let name = names.intern(&entry.name);
        if !seen.insert(name.clone()) {
            continue;
        }
        match old.remove(&name) {
            Some(mut slot) if slot.value_type() == entry.ty => {
                slot.set_location(None);
                slots.push(slot);
                carried.push(true);
            }
            Some(mut slot) => {
                slot.set_type(entry.ty);
                slot.set_location(None);
                slots.push(slot);
                carried.push(false);
            }
            None => {
                slots.push(ShaderUniform::new(name, entry.ty, None));
                carried.push(false);
            }
        }
    }

    (slots, carried)
}

/// Query the driver location of every slot
pub(super) fn assign_locations<B: GraphicsBackend>(
    backend: &B,
    program: B::Program,
    slots: &mut [ShaderUniform],
) {
    for slot in slots {
        let location = backend.uniform_location(program, slot.name().as_str());
        slot.set_location(location);
    }
}

/// Give every sampler slot a texture unit.
///
/// A unit belongs to the sampler, not to its position in the uniform list:
/// carried-forward samplers keep their unit unless an earlier one already
/// took it, even when the relink reordered or added uniforms. Everything
/// else gets the lowest free unit, in list order, so a first compile numbers
/// samplers 0, 1, 2 in enumeration order.
pub(super) fn allocate_sampler_units(
    slots: &mut [ShaderUniform],
    carried: &[bool],
    max_units: u8,
    label: &str,
) {
    let mut used = [false; 256];
    let mut pending = Vec::new();

    for (index, slot) in slots.iter().enumerate() {
        let Some(unit) = slot.sampler_index() else {
            continue;
        };
        if carried.get(index).copied().unwrap_or(false) && !used[unit as usize] {
            used[unit as usize] = true;
        } else {
            pending.push(index);
        }
    }

    for index in pending {
        let Some(unit) = used.iter().position(|taken| !taken) else {
            log::warn!(
                "[shader] '{}': no texture unit left for '{}'",
                label,
                slots[index].name()
            );
            continue;
        };
        used[unit] = true;
        slots[index].set_sampler_index(unit as u8);
    }

    for slot in slots.iter() {
        if let Some(unit) = slot.sampler_index() {
            if unit >= max_units {
                log::warn!(
                    "[shader] '{}': sampler '{}' uses texture unit {} (driver offers {})",
                    label,
                    slot.name(),
                    unit,
                    max_units
                );
            }
        }
    }
}

/// Full reconciliation against a freshly linked program
pub(super) fn reconcile<B: GraphicsBackend>(
    backend: &B,
    program: B::Program,
    names: &NameInterner,
    previous: Vec<ShaderUniform>,
    max_units: u8,
    label: &str,
) -> Vec<ShaderUniform> {
    let active = active_slots(backend, program, label);
    let (mut slots, carried) = merge(previous, active, names);
    assign_locations(backend, program, &mut slots);
    allocate_sampler_units(&mut slots, &carried, max_units, label);
    slots
}
