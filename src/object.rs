//! Object table: attributes, parent/sibling/child tree, and properties.
//! Dispatches on story version between the v3 layout (9-byte entries, 31
//! default properties, byte-sized tree links) and the v4/5 layout (14-byte
//! entries, 63 default properties, word-sized tree links).

use crate::error::{ZMachineError, ZResult};
use crate::vm::VM;
use log::{debug, warn};

const MAX_PROPERTIES_V3: u16 = 31;
const MAX_PROPERTIES_V4: u16 = 63;
const MAX_ATTRIBUTES_V3: u16 = 31;
const MAX_ATTRIBUTES_V4: u16 = 47;

fn entry_size(version: u8) -> usize {
    if version <= 3 {
        9
    } else {
        14
    }
}

fn max_properties(version: u8) -> u16 {
    if version <= 3 {
        MAX_PROPERTIES_V3
    } else {
        MAX_PROPERTIES_V4
    }
}

fn max_attributes(version: u8) -> u16 {
    if version <= 3 {
        MAX_ATTRIBUTES_V3
    } else {
        MAX_ATTRIBUTES_V4
    }
}

/// Offsets within an object entry of the parent/sibling/child links and the
/// property-table pointer, which differ in width between v3 and v4/5.
struct Layout {
    attr_bytes: u32,
    parent: u32,
    sibling: u32,
    child: u32,
    prop_table: u32,
    link_is_word: bool,
}

fn layout(version: u8) -> Layout {
    if version <= 3 {
        Layout {
            attr_bytes: 4,
            parent: 4,
            sibling: 5,
            child: 6,
            prop_table: 7,
            link_is_word: false,
        }
    } else {
        Layout {
            attr_bytes: 6,
            parent: 6,
            sibling: 8,
            child: 10,
            prop_table: 12,
            link_is_word: true,
        }
    }
}

pub trait ObjectTable {
    fn object_addr(&self, obj_num: u16) -> ZResult<u32>;
    fn get_attr(&self, obj_num: u16, attr_num: u16) -> ZResult<bool>;
    fn set_attr(&mut self, obj_num: u16, attr_num: u16) -> ZResult<()>;
    fn clear_attr(&mut self, obj_num: u16, attr_num: u16) -> ZResult<()>;
    fn get_parent(&self, obj_num: u16) -> ZResult<u16>;
    fn set_parent(&mut self, obj_num: u16, parent: u16) -> ZResult<()>;
    fn get_sibling(&self, obj_num: u16) -> ZResult<u16>;
    fn set_sibling(&mut self, obj_num: u16, sibling: u16) -> ZResult<()>;
    fn get_child(&self, obj_num: u16) -> ZResult<u16>;
    fn set_child(&mut self, obj_num: u16, child: u16) -> ZResult<()>;
    /// Remove `obj_num` from its parent's child list, patching sibling
    /// links, and clear its own parent/sibling.
    fn orphan(&mut self, obj_num: u16) -> ZResult<()>;
    /// Detach `obj_num` and make it the first child of `dest`.
    fn insert(&mut self, obj_num: u16, dest: u16) -> ZResult<()>;
    fn property_table_addr(&self, obj_num: u16) -> ZResult<u32>;
    /// Address of the first property entry, after the short name.
    fn first_property_addr(&self, obj_num: u16) -> ZResult<u32>;
    /// Address of the next property entry given the address of a current
    /// one (its size byte/header), or 0 at the end of the list.
    fn next_property_addr(&self, prop_addr: u32) -> ZResult<u32>;
    fn property_number(&self, prop_addr: u32) -> u16;
    fn property_size(&self, prop_addr: u32) -> usize;
    /// Address of the property `prop_num`'s data, or 0 if absent.
    fn get_property_addr(&self, obj_num: u16, prop_num: u16) -> ZResult<u32>;
    fn get_property_data(&self, obj_num: u16, prop_num: u16) -> ZResult<u16>;
    fn set_property_data(&mut self, obj_num: u16, prop_num: u16, value: u16) -> ZResult<()>;
    fn get_default_property(&self, prop_num: u16) -> ZResult<u16>;
}

impl ObjectTable for VM {
    fn object_addr(&self, obj_num: u16) -> ZResult<u32> {
        if obj_num == 0 {
            return Err(ZMachineError::InvalidArgument {
                detail: "object 0 has no entry".into(),
            });
        }
        let version = self.game.header.version;
        let base = self.game.header.object_table_addr as u32 + max_properties(version) as u32 * 2;
        Ok(base + (obj_num - 1) as u32 * entry_size(version) as u32)
    }

    fn get_attr(&self, obj_num: u16, attr_num: u16) -> ZResult<bool> {
        let version = self.game.header.version;
        if attr_num > max_attributes(version) {
            warn!("attribute {attr_num} out of range (max {})", max_attributes(version));
            return Ok(false);
        }
        let addr = self.object_addr(obj_num)?;
        let byte_addr = addr + (attr_num / 8) as u32;
        let bit = 7 - (attr_num % 8);
        Ok(self.game.memory.read_byte(byte_addr) & (1 << bit) != 0)
    }

    fn set_attr(&mut self, obj_num: u16, attr_num: u16) -> ZResult<()> {
        let version = self.game.header.version;
        if attr_num > max_attributes(version) {
            warn!("attribute {attr_num} out of range (max {})", max_attributes(version));
            return Ok(());
        }
        let addr = self.object_addr(obj_num)?;
        let byte_addr = addr + (attr_num / 8) as u32;
        let bit = 7 - (attr_num % 8);
        let byte = self.game.memory.read_byte(byte_addr);
        self.game.memory.write_byte(byte_addr, byte | (1 << bit))
    }

    fn clear_attr(&mut self, obj_num: u16, attr_num: u16) -> ZResult<()> {
        let version = self.game.header.version;
        if attr_num > max_attributes(version) {
            warn!("attribute {attr_num} out of range (max {})", max_attributes(version));
            return Ok(());
        }
        let addr = self.object_addr(obj_num)?;
        let byte_addr = addr + (attr_num / 8) as u32;
        let bit = 7 - (attr_num % 8);
        let byte = self.game.memory.read_byte(byte_addr);
        self.game.memory.write_byte(byte_addr, byte & !(1 << bit))
    }

    fn get_parent(&self, obj_num: u16) -> ZResult<u16> {
        let l = layout(self.game.header.version);
        let addr = self.object_addr(obj_num)?;
        Ok(if l.link_is_word {
            self.game.memory.read_word(addr + l.parent)
        } else {
            self.game.memory.read_byte(addr + l.parent) as u16
        })
    }

    fn set_parent(&mut self, obj_num: u16, parent: u16) -> ZResult<()> {
        let l = layout(self.game.header.version);
        let addr = self.object_addr(obj_num)?;
        if l.link_is_word {
            self.game.memory.write_word(addr + l.parent, parent)
        } else {
            self.game.memory.write_byte(addr + l.parent, parent as u8)
        }
    }

    fn get_sibling(&self, obj_num: u16) -> ZResult<u16> {
        let l = layout(self.game.header.version);
        let addr = self.object_addr(obj_num)?;
        Ok(if l.link_is_word {
            self.game.memory.read_word(addr + l.sibling)
        } else {
            self.game.memory.read_byte(addr + l.sibling) as u16
        })
    }

    fn set_sibling(&mut self, obj_num: u16, sibling: u16) -> ZResult<()> {
        let l = layout(self.game.header.version);
        let addr = self.object_addr(obj_num)?;
        if l.link_is_word {
            self.game.memory.write_word(addr + l.sibling, sibling)
        } else {
            self.game.memory.write_byte(addr + l.sibling, sibling as u8)
        }
    }

    fn get_child(&self, obj_num: u16) -> ZResult<u16> {
        let l = layout(self.game.header.version);
        let addr = self.object_addr(obj_num)?;
        Ok(if l.link_is_word {
            self.game.memory.read_word(addr + l.child)
        } else {
            self.game.memory.read_byte(addr + l.child) as u16
        })
    }

    fn set_child(&mut self, obj_num: u16, child: u16) -> ZResult<()> {
        let l = layout(self.game.header.version);
        let addr = self.object_addr(obj_num)?;
        if l.link_is_word {
            self.game.memory.write_word(addr + l.child, child)
        } else {
            self.game.memory.write_byte(addr + l.child, child as u8)
        }
    }

    fn orphan(&mut self, obj_num: u16) -> ZResult<()> {
        let parent = self.get_parent(obj_num)?;
        if parent == 0 {
            return Ok(());
        }
        let sibling = self.get_sibling(obj_num)?;
        let first_child = self.get_child(parent)?;
        if first_child == obj_num {
            self.set_child(parent, sibling)?;
        } else {
            let mut cur = first_child;
            while cur != 0 {
                let next = self.get_sibling(cur)?;
                if next == obj_num {
                    self.set_sibling(cur, sibling)?;
                    break;
                }
                cur = next;
            }
        }
        self.set_parent(obj_num, 0)?;
        self.set_sibling(obj_num, 0)?;
        debug!("orphaned object {obj_num} from parent {parent}");
        Ok(())
    }

    fn insert(&mut self, obj_num: u16, dest: u16) -> ZResult<()> {
        self.orphan(obj_num)?;
        let old_first_child = self.get_child(dest)?;
        self.set_sibling(obj_num, old_first_child)?;
        self.set_child(dest, obj_num)?;
        self.set_parent(obj_num, dest)?;
        debug!("inserted object {obj_num} as first child of {dest}");
        Ok(())
    }

    fn property_table_addr(&self, obj_num: u16) -> ZResult<u32> {
        let l = layout(self.game.header.version);
        let addr = self.object_addr(obj_num)?;
        Ok(self.game.memory.read_word(addr + l.prop_table) as u32)
    }

    fn first_property_addr(&self, obj_num: u16) -> ZResult<u32> {
        let table = self.property_table_addr(obj_num)?;
        let name_len_words = self.game.memory.read_byte(table) as u32;
        Ok(table + 1 + name_len_words * 2)
    }

    fn next_property_addr(&self, prop_addr: u32) -> ZResult<u32> {
        let size_byte = self.game.memory.read_byte(prop_addr);
        if size_byte == 0 {
            return Ok(0);
        }
        let version = self.game.header.version;
        if version <= 3 {
            let size = ((size_byte >> 5) & 0x07) as u32 + 1;
            Ok(prop_addr + 1 + size)
        } else if size_byte & 0x80 != 0 {
            let second = self.game.memory.read_byte(prop_addr + 1);
            let size = (second & 0x3f) as u32;
            let size = if size == 0 { 64 } else { size };
            Ok(prop_addr + 2 + size)
        } else {
            let size = if size_byte & 0x40 != 0 { 2 } else { 1 };
            Ok(prop_addr + 1 + size)
        }
    }

    fn property_number(&self, prop_addr: u32) -> u16 {
        let size_byte = self.game.memory.read_byte(prop_addr);
        if self.game.header.version <= 3 {
            (size_byte & 0x1f) as u16
        } else {
            (size_byte & 0x3f) as u16
        }
    }

    fn property_size(&self, prop_addr: u32) -> usize {
        let size_byte = self.game.memory.read_byte(prop_addr);
        if self.game.header.version <= 3 {
            (((size_byte >> 5) & 0x07) + 1) as usize
        } else if size_byte & 0x80 != 0 {
            let second = self.game.memory.read_byte(prop_addr + 1);
            let size = (second & 0x3f) as usize;
            if size == 0 {
                64
            } else {
                size
            }
        } else if size_byte & 0x40 != 0 {
            2
        } else {
            1
        }
    }

    fn get_property_addr(&self, obj_num: u16, prop_num: u16) -> ZResult<u32> {
        let mut addr = self.first_property_addr(obj_num)?;
        loop {
            let size_byte = self.game.memory.read_byte(addr);
            if size_byte == 0 {
                return Ok(0);
            }
            let current = self.property_number(addr);
            if current == prop_num {
                let header_size = if self.game.header.version <= 3 {
                    1
                } else if size_byte & 0x80 != 0 {
                    2
                } else {
                    1
                };
                return Ok(addr + header_size);
            }
            if current < prop_num {
                return Ok(0);
            }
            let next = self.next_property_addr(addr)?;
            if next == 0 {
                return Ok(0);
            }
            addr = next;
        }
    }

    fn get_property_data(&self, obj_num: u16, prop_num: u16) -> ZResult<u16> {
        if prop_num == 0 {
            return Err(ZMachineError::InvalidArgument {
                detail: "property number 0 is invalid".into(),
            });
        }
        let data_addr = self.get_property_addr(obj_num, prop_num)?;
        if data_addr == 0 {
            return self.get_default_property(prop_num);
        }
        let prop_addr = if self.game.header.version <= 3 {
            data_addr - 1
        } else if self.game.memory.read_byte(data_addr - 1) & 0x80 != 0 {
            data_addr - 2
        } else {
            data_addr - 1
        };
        match self.property_size(prop_addr) {
            1 => Ok(self.game.memory.read_byte(data_addr) as u16),
            2 => Ok(self.game.memory.read_word(data_addr)),
            other => Err(ZMachineError::InvalidObjectState {
                detail: format!("get_prop on property of size {other} (must be 1 or 2)"),
            }),
        }
    }

    fn set_property_data(&mut self, obj_num: u16, prop_num: u16, value: u16) -> ZResult<()> {
        let data_addr = self.get_property_addr(obj_num, prop_num)?;
        if data_addr == 0 {
            return Err(ZMachineError::InvalidObjectState {
                detail: format!("object {obj_num} has no property {prop_num} to set"),
            });
        }
        let prop_addr = if self.game.header.version <= 3 {
            data_addr - 1
        } else if self.game.memory.read_byte(data_addr - 1) & 0x80 != 0 {
            data_addr - 2
        } else {
            data_addr - 1
        };
        match self.property_size(prop_addr) {
            1 => self.game.memory.write_byte(data_addr, value as u8),
            2 => self.game.memory.write_word(data_addr, value),
            other => Err(ZMachineError::InvalidObjectState {
                detail: format!("put_prop on property of size {other} (must be 1 or 2)"),
            }),
        }
    }

    fn get_default_property(&self, prop_num: u16) -> ZResult<u16> {
        let version = self.game.header.version;
        if prop_num == 0 || prop_num > max_properties(version) {
            return Err(ZMachineError::InvalidArgument {
                detail: format!("property {prop_num} out of range (max {})", max_properties(version)),
            });
        }
        let addr = self.game.header.object_table_addr as u32 + (prop_num - 1) as u32 * 2;
        Ok(self.game.memory.read_word(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A minimal v3 story image: header, empty property defaults, two
    /// object entries, and a property table for object 1 holding property
    /// 1 (size 1, value 0x42).
    fn sample_game_bytes() -> Vec<u8> {
        let mut bytes = vec![0u8; 0x200];
        bytes[0x00] = 3; // version
        bytes[0x0a] = 0x00;
        bytes[0x0b] = 0x40; // object table address
        bytes[0x0e] = 0x01;
        bytes[0x0f] = 0x80; // static memory base

        let obj1 = 0x7e;
        bytes[obj1 + 7] = 0x01;
        bytes[obj1 + 8] = 0x00; // property table at 0x0100

        bytes[0x100] = 0x00; // short name length 0
        bytes[0x101] = 0x01; // size 1, property 1
        bytes[0x102] = 0x42;
        bytes[0x103] = 0x00; // terminator
        bytes
    }

    fn sample_vm() -> VM {
        VM::new(sample_game_bytes(), 80, 24).unwrap()
    }

    #[test]
    fn attribute_set_get_clear_round_trip() {
        let mut vm = sample_vm();
        assert!(!vm.get_attr(1, 3).unwrap());
        vm.set_attr(1, 3).unwrap();
        assert!(vm.get_attr(1, 3).unwrap());
        vm.clear_attr(1, 3).unwrap();
        assert!(!vm.get_attr(1, 3).unwrap());
    }

    #[test]
    fn tree_links_round_trip_for_v3() {
        let mut vm = sample_vm();
        vm.set_parent(1, 2).unwrap();
        vm.set_sibling(1, 5).unwrap();
        vm.set_child(1, 9).unwrap();
        assert_eq!(vm.get_parent(1).unwrap(), 2);
        assert_eq!(vm.get_sibling(1).unwrap(), 5);
        assert_eq!(vm.get_child(1).unwrap(), 9);
    }

    #[test]
    fn insert_and_orphan_maintain_sibling_chain() {
        let mut vm = sample_vm();
        vm.insert(1, 2).unwrap();
        assert_eq!(vm.get_child(2).unwrap(), 1);
        assert_eq!(vm.get_parent(1).unwrap(), 2);

        vm.orphan(1).unwrap();
        assert_eq!(vm.get_parent(1).unwrap(), 0);
        assert_eq!(vm.get_child(2).unwrap(), 0);
    }

    #[test]
    fn get_property_data_finds_entry_and_falls_back_to_default() {
        let vm = sample_vm();
        assert_eq!(vm.get_property_data(1, 1).unwrap(), 0x42);
        // Property 5 isn't present on object 1; default table is all zero.
        assert_eq!(vm.get_property_data(1, 5).unwrap(), 0);
    }

    #[test]
    fn set_property_data_writes_through() {
        let mut vm = sample_vm();
        vm.set_property_data(1, 1, 0x99).unwrap();
        assert_eq!(vm.get_property_data(1, 1).unwrap(), 0x99);
    }

    #[test]
    fn property_number_zero_is_rejected() {
        let vm = sample_vm();
        assert!(vm.get_property_data(1, 0).is_err());
    }
}
