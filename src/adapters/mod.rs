// Adapters layer: concrete implementations for external systems (radio device, serial ports).

pub mod meshtastic;
pub mod system;
