//! The slice of a process the fault handler needs.

use alloc::string::String;

use crate::AddressSpace;

/// A user process and the address space it runs in.
///
/// A process exists before its address space does (during `exec`, for instance), so the
/// address space is optional. A fault taken while it is missing is a kernel fault.
pub struct Process {
    name: String,
    address_space: Option<AddressSpace>,
}

impl Process {
    /// Creates a process with no address space.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address_space: None,
        }
    }

    /// Returns the process name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Installs `space` and returns the address space it replaces.
    pub fn set_address_space(&mut self, space: Option<AddressSpace>) -> Option<AddressSpace> {
        core::mem::replace(&mut self.address_space, space)
    }

    /// Returns the current address space.
    pub fn address_space(&self) -> Option<&AddressSpace> {
        self.address_space.as_ref()
    }

    /// Returns the current address space mutably.
    pub fn address_space_mut(&mut self) -> Option<&mut AddressSpace> {
        self.address_space.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VirtualAddress;

    #[test]
    fn set_address_space_returns_previous() {
        let mut process = Process::new("sh");
        assert!(process.address_space().is_none());

        let mut first = AddressSpace::new();
        first.define_region(VirtualAddress::new(0x0100), 16).unwrap();
        assert!(process.set_address_space(Some(first)).is_none());

        let previous = process
            .set_address_space(Some(AddressSpace::new()))
            .expect("previous address space");
        assert!(previous.code().is_some());
        assert!(process.address_space().is_some_and(|space| space.code().is_none()));
    }
}
