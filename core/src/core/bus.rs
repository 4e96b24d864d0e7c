/// Classes of bus targets that the clock model may charge differently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum DeviceClass {
    Memory,      // Plain RAM/ROM
    VideoMemory, // Memory-mapped VRAM shared with the display refresh
    IoPort,      // Anything behind IN/OUT
}

/// Interrupt lines the host can raise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterruptKind {
    Maskable,
    NonMaskable,
}

/// Memory collaborator. Must be total over the full 16-bit address space.
///
/// Reads take `&mut self` because real hardware reads can have side effects
/// (latches, access counters) and the decoder reads operand bytes through it.
pub trait Memory {
    fn read_byte(&mut self, addr: u16) -> u8;
    fn write_byte(&mut self, addr: u16, value: u8);

    /// Little-endian word read. The high byte address wraps at 0xFFFF.
    fn read_word(&mut self, addr: u16) -> u16 {
        let low = self.read_byte(addr);
        let high = self.read_byte(addr.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    /// Little-endian word write. The high byte address wraps at 0xFFFF.
    fn write_word(&mut self, addr: u16, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.write_byte(addr, low);
        self.write_byte(addr.wrapping_add(1), high);
    }

    /// Which device class answers at `addr`. Used only for timing.
    fn device_class(&self, _addr: u16) -> DeviceClass {
        DeviceClass::Memory
    }
}

/// I/O port collaborator. Port numbers are the low byte of whatever
/// 16-bit port expression the instruction put on the bus.
pub trait IoPorts {
    fn read_port(&mut self, port: u8) -> u8;
    fn write_port(&mut self, port: u8, value: u8);
}

impl<M: Memory + ?Sized> Memory for &mut M {
    fn read_byte(&mut self, addr: u16) -> u8 {
        (**self).read_byte(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        (**self).write_byte(addr, value)
    }

    fn read_word(&mut self, addr: u16) -> u16 {
        (**self).read_word(addr)
    }

    fn write_word(&mut self, addr: u16, value: u16) {
        (**self).write_word(addr, value)
    }

    fn device_class(&self, addr: u16) -> DeviceClass {
        (**self).device_class(addr)
    }
}

impl<I: IoPorts + ?Sized> IoPorts for &mut I {
    fn read_port(&mut self, port: u8) -> u8 {
        (**self).read_port(port)
    }

    fn write_port(&mut self, port: u8, value: u8) {
        (**self).write_port(port, value)
    }
}

/// Port space with nothing attached: reads float high, writes are dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenBus;

impl IoPorts for OpenBus {
    fn read_port(&mut self, _port: u8) -> u8 {
        0xFF
    }

    fn write_port(&mut self, _port: u8, _value: u8) {}
}

/// Counts accesses that the clock model charges extra for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccessCounts {
    pub video: u32,
    pub io: u32,
}

/// Wraps a memory collaborator and counts video-memory accesses.
pub(crate) struct MeteredMemory<'a, M: Memory + ?Sized> {
    inner: &'a mut M,
    pub(crate) video_accesses: u32,
}

impl<'a, M: Memory + ?Sized> MeteredMemory<'a, M> {
    pub(crate) fn new(inner: &'a mut M) -> Self {
        Self { inner, video_accesses: 0 }
    }

    fn note(&mut self, addr: u16) {
        if self.inner.device_class(addr) == DeviceClass::VideoMemory {
            self.video_accesses += 1;
        }
    }
}

impl<M: Memory + ?Sized> Memory for MeteredMemory<'_, M> {
    fn read_byte(&mut self, addr: u16) -> u8 {
        self.note(addr);
        self.inner.read_byte(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        self.note(addr);
        self.inner.write_byte(addr, value)
    }

    fn device_class(&self, addr: u16) -> DeviceClass {
        self.inner.device_class(addr)
    }
}

/// Wraps a port collaborator and counts every access.
pub(crate) struct MeteredIo<'a, I: IoPorts + ?Sized> {
    inner: &'a mut I,
    pub(crate) accesses: u32,
}

impl<'a, I: IoPorts + ?Sized> MeteredIo<'a, I> {
    pub(crate) fn new(inner: &'a mut I) -> Self {
        Self { inner, accesses: 0 }
    }
}

impl<I: IoPorts + ?Sized> IoPorts for MeteredIo<'_, I> {
    fn read_port(&mut self, port: u8) -> u8 {
        self.accesses += 1;
        self.inner.read_port(port)
    }

    fn write_port(&mut self, port: u8, value: u8) {
        self.accesses += 1;
        self.inner.write_port(port, value)
    }
}
