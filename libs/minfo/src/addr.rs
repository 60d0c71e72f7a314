use core::{
    fmt,
    ops::{Add, Deref},
};

/// A physical address.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
#[repr(transparent)]
pub struct PAddr(usize);

impl PAddr {
    #[inline]
    pub const fn new(addr: usize) -> Self {
        PAddr(addr)
    }

    /// Get the address through the direct mapping located `id_off` bytes
    /// above physical address 0.
    #[inline]
    pub fn to_laddr(self, id_off: usize) -> LAddr {
        LAddr::from(self.0 + id_off)
    }

    #[inline]
    pub const fn in_page_offset(self) -> usize {
        self.0 & crate::PAGE_MASK
    }

    #[inline]
    pub const fn is_page_aligned(self) -> bool {
        self.in_page_offset() == 0
    }

    #[inline]
    pub const fn page_round_up(self) -> Self {
        PAddr(crate::page_round_up(self.0))
    }
}

impl Deref for PAddr {
    type Target = usize;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Add<usize> for PAddr {
    type Output = PAddr;

    #[inline]
    fn add(self, rhs: usize) -> Self::Output {
        PAddr(self.0 + rhs)
    }
}

impl fmt::Debug for PAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PAddr({:#x})", self.0)
    }
}

/// A linear (virtual) address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct LAddr(*mut u8);

impl LAddr {
    #[inline]
    pub const fn new(ptr: *mut u8) -> Self {
        LAddr(ptr)
    }

    #[inline]
    pub fn val(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn to_paddr(self, id_off: usize) -> PAddr {
        PAddr(self.val() - id_off)
    }
}

impl Deref for LAddr {
    type Target = *mut u8;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<usize> for LAddr {
    #[inline]
    fn from(val: usize) -> Self {
        LAddr(val as *mut u8)
    }
}
