//! Paged, layered CPU memory map.
//!
//! The 64 KiB address space is split into 1 KiB pages. Each of the
//! [`NUM_LAYERS`] layers can map any page to a slice of a backing store,
//! separately for reads and writes. For every page the highest-priority
//! layer (layer 0) that maps it wins; bank switching is done by remapping a
//! layer rather than by copying memory around.

pub const PAGE_SHIFT: u32 = 10;
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
pub const PAGE_MASK: u16 = (PAGE_SIZE - 1) as u16;
pub const NUM_PAGES: usize = 0x10000 / PAGE_SIZE;
pub const NUM_LAYERS: usize = 4;

/// Value seen when reading an address no layer maps.
pub const UNMAPPED: u8 = 0xFF;

/// Handle to a backing store owned by a [`Memory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(usize);

/// Where one direction of one page ends up: store and byte offset of the
/// page's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Target {
    store: StoreId,
    offset: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Page {
    read: Option<Target>,
    write: Option<Target>,
}

impl Page {
    fn is_mapped(&self) -> bool {
        self.read.is_some() || self.write.is_some()
    }
}

pub struct Memory {
    stores: Vec<Vec<u8>>,
    layers: [[Page; NUM_PAGES]; NUM_LAYERS],
    /// Per-page winner across layers, rebuilt after every map change.
    pages: [Page; NUM_PAGES],
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        Self {
            stores: Vec::new(),
            layers: [[Page::default(); NUM_PAGES]; NUM_LAYERS],
            pages: [Page::default(); NUM_PAGES],
        }
    }

    /// Hand a backing store to the map. The map owns it from now on.
    pub fn add_store(&mut self, data: Vec<u8>) -> StoreId {
        self.stores.push(data);
        StoreId(self.stores.len() - 1)
    }

    pub fn store(&self, id: StoreId) -> &[u8] {
        &self.stores[id.0]
    }

    pub fn store_mut(&mut self, id: StoreId) -> &mut [u8] {
        &mut self.stores[id.0]
    }

    /// Map `size` bytes at `addr` to `store[offset..]`, readable and writable.
    pub fn map_ram(&mut self, layer: usize, addr: u16, size: usize, store: StoreId, offset: usize) {
        self.map_rw(layer, addr, size, Some((store, offset)), Some((store, offset)));
    }

    /// Map read-only: writes to these pages fall through to nothing.
    pub fn map_rom(&mut self, layer: usize, addr: u16, size: usize, store: StoreId, offset: usize) {
        self.map_rw(layer, addr, size, Some((store, offset)), None);
    }

    /// Map reads and writes of the same pages to different places (ROM
    /// shadowed by RAM, write-only video memory, ...). `None` leaves that
    /// direction unmapped within this layer.
    pub fn map_rw(
        &mut self,
        layer: usize,
        addr: u16,
        size: usize,
        read: Option<(StoreId, usize)>,
        write: Option<(StoreId, usize)>,
    ) {
        debug_assert!(layer < NUM_LAYERS);
        debug_assert!(addr & PAGE_MASK == 0, "map address {addr:#06X} not page aligned");
        debug_assert!(size % PAGE_SIZE == 0 && size > 0, "map size {size:#X} not page aligned");
        debug_assert!(addr as usize + size <= 0x10000);
        for (store, offset) in read.iter().chain(write.iter()) {
            debug_assert!(
                offset + size <= self.stores[store.0].len(),
                "mapping runs past the end of its store"
            );
        }

        let first = addr as usize >> PAGE_SHIFT;
        let count = size >> PAGE_SHIFT;
        for i in 0..count.min(NUM_PAGES - first) {
            let page_offset = i * PAGE_SIZE;
            self.layers[layer][first + i] = Page {
                read: read.map(|(store, offset)| Target { store, offset: offset + page_offset }),
                write: write.map(|(store, offset)| Target { store, offset: offset + page_offset }),
            };
        }
        log::debug!("memory: layer {layer} mapped {addr:#06X}+{size:#X}");
        self.update_pages();
    }

    pub fn unmap_layer(&mut self, layer: usize) {
        self.layers[layer] = [Page::default(); NUM_PAGES];
        self.update_pages();
    }

    pub fn unmap_all(&mut self) {
        self.layers = [[Page::default(); NUM_PAGES]; NUM_LAYERS];
        self.update_pages();
    }

    fn update_pages(&mut self) {
        for (index, page) in self.pages.iter_mut().enumerate() {
            *page = self
                .layers
                .iter()
                .map(|layer| layer[index])
                .find(Page::is_mapped)
                .unwrap_or_default();
        }
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        match self.pages[(addr >> PAGE_SHIFT) as usize].read {
            Some(target) => self.stores[target.store.0]
                .get(target.offset + (addr & PAGE_MASK) as usize)
                .copied()
                .unwrap_or(UNMAPPED),
            None => UNMAPPED,
        }
    }

    #[inline]
    pub fn write(&mut self, addr: u16, data: u8) {
        let Some(target) = self.pages[(addr >> PAGE_SHIFT) as usize].write else {
            return;
        };
        if let Some(byte) =
            self.stores[target.store.0].get_mut(target.offset + (addr & PAGE_MASK) as usize)
        {
            *byte = data;
        }
    }

    /// Little-endian word, wrapping at the top of the address space.
    pub fn read_word(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.read(addr), self.read(addr.wrapping_add(1))])
    }

    pub fn write_word(&mut self, addr: u16, data: u16) {
        let [lo, hi] = data.to_le_bytes();
        self.write(addr, lo);
        self.write(addr.wrapping_add(1), hi);
    }

    /// Copy `bytes` into memory through the write mapping, as a program
    /// would. Bytes landing on ROM or unmapped pages are dropped.
    pub fn load(&mut self, addr: u16, bytes: &[u8]) {
        let mut a = addr;
        for &b in bytes {
            self.write(a, b);
            a = a.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_reads_float_high() {
        let mut mem = Memory::new();
        assert_eq!(mem.read(0x1234), 0xFF);
        mem.write(0x1234, 0x00);
        assert_eq!(mem.read(0x1234), 0xFF);
    }

    #[test]
    fn higher_priority_layer_wins() {
        let mut mem = Memory::new();
        let ram = mem.add_store(vec![0x11; 0x4000]);
        let rom = mem.add_store(vec![0x22; 0x0400]);
        mem.map_ram(1, 0x0000, 0x4000, ram, 0);
        mem.map_rom(0, 0x0400, 0x0400, rom, 0);

        assert_eq!(mem.read(0x03FF), 0x11);
        assert_eq!(mem.read(0x0400), 0x22);
        assert_eq!(mem.read(0x0800), 0x11);

        // ROM page swallows writes, the RAM underneath stays untouched
        mem.write(0x0400, 0x99);
        assert_eq!(mem.read(0x0400), 0x22);
        assert_eq!(mem.store(ram)[0x0400], 0x11);

        mem.unmap_layer(0);
        assert_eq!(mem.read(0x0400), 0x11);

        mem.unmap_all();
        assert_eq!(mem.read(0x0000), 0xFF);
    }

    #[test]
    fn split_read_write_mapping() {
        let mut mem = Memory::new();
        let rom = mem.add_store(vec![0xC9; 0x0400]);
        let ram = mem.add_store(vec![0x00; 0x0400]);
        mem.map_rw(0, 0xF000, 0x0400, Some((rom, 0)), Some((ram, 0)));

        mem.write(0xF010, 0x42);
        assert_eq!(mem.read(0xF010), 0xC9);
        assert_eq!(mem.store(ram)[0x10], 0x42);
    }

    #[test]
    fn words_wrap_and_load_respects_rom() {
        let mut mem = Memory::new();
        let ram = mem.add_store(vec![0; 0x10000]);
        mem.map_ram(1, 0x0000, 0x10000, ram, 0);
        mem.write_word(0xFFFF, 0xBEEF);
        assert_eq!(mem.read(0xFFFF), 0xEF);
        assert_eq!(mem.read(0x0000), 0xBE);
        assert_eq!(mem.read_word(0xFFFF), 0xBEEF);

        let rom = mem.add_store(vec![0xAA; 0x0400]);
        mem.map_rom(0, 0x0400, 0x0400, rom, 0);
        mem.load(0x03FE, &[1, 2, 3, 4]);
        assert_eq!(mem.read(0x03FE), 1);
        assert_eq!(mem.read(0x03FF), 2);
        assert_eq!(mem.read(0x0400), 0xAA);
        assert_eq!(mem.store(ram)[0x0400], 0);
    }
}
