//! Virtual-memory primitives: reserve, commit, decommit, release.
//!
//! This module holds all of the crate's operating-system `unsafe` code.
//! A reservation is address space only (no access, no physical backing);
//! committing a sub-range makes it readable/writable and backed; decommitting
//! returns the pages to the OS while keeping the addresses reserved.

use std::ptr::NonNull;

use strata_core::AllocationError;

pub use imp::{commit, decommit, page_size, release, reserve};

#[cfg(unix)]
mod imp {
    use std::io;
    use std::ptr::{self, NonNull};

    use strata_core::AllocationError;

    use super::classify;

    fn last_errno() -> i32 {
        io::Error::last_os_error().raw_os_error().unwrap_or(0)
    }

    /// The platform's minimum commit granularity in bytes.
    pub fn page_size() -> usize {
        // SAFETY: sysconf has no memory-safety preconditions.
        let n = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if n < 1 {
            4096
        } else {
            n as usize
        }
    }

    /// Reserve `size` bytes of address space with no access rights.
    pub fn reserve(size: usize) -> Result<NonNull<u8>, AllocationError> {
        if size == 0 {
            return Err(AllocationError::InvalidArgument);
        }
        // SAFETY: anonymous private mapping at a kernel-chosen address.
        let mapped = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if mapped == libc::MAP_FAILED {
            return Err(classify(last_errno(), AllocationError::InvalidArgument));
        }
        NonNull::new(mapped.cast::<u8>()).ok_or(AllocationError::OutOfMemory)
    }

    /// Make `[ptr, ptr + size)` readable, writable and physically backed.
    ///
    /// # Safety
    ///
    /// The range must lie inside a live reservation from [`reserve`].
    pub unsafe fn commit(ptr: NonNull<u8>, size: usize) -> Result<(), AllocationError> {
        // SAFETY: caller guarantees the range is part of our mapping.
        let rc = unsafe {
            libc::mprotect(ptr.as_ptr().cast(), size, libc::PROT_READ | libc::PROT_WRITE)
        };
        if rc != 0 {
            return Err(classify(last_errno(), AllocationError::InvalidPointer));
        }
        Ok(())
    }

    /// Revoke access to `[ptr, ptr + size)` and hand its pages back.
    ///
    /// # Safety
    ///
    /// The range must lie inside a live reservation and must not be
    /// referenced afterwards until it is committed again.
    pub unsafe fn decommit(ptr: NonNull<u8>, size: usize) {
        // SAFETY: caller guarantees the range is part of our mapping.
        unsafe {
            libc::mprotect(ptr.as_ptr().cast(), size, libc::PROT_NONE);
            let _ = libc::madvise(ptr.as_ptr().cast(), size, libc::MADV_DONTNEED);
        }
    }

    /// Unreserve the whole region.
    ///
    /// # Safety
    ///
    /// `ptr`/`size` must describe exactly one reservation from [`reserve`],
    /// and nothing may reference it afterwards.
    pub unsafe fn release(ptr: NonNull<u8>, size: usize) {
        // SAFETY: caller guarantees this is our reservation.
        unsafe {
            libc::munmap(ptr.as_ptr().cast(), size);
        }
    }

    pub(super) const ENOMEM: i32 = libc::ENOMEM;
    pub(super) const EAGAIN: i32 = libc::EAGAIN;
    pub(super) const EINVAL: i32 = libc::EINVAL;
}

#[cfg(windows)]
mod imp {
    use std::mem;
    use std::ptr::{self, NonNull};

    use strata_core::AllocationError;
    use windows_sys::Win32::Foundation::{
        GetLastError, ERROR_COMMITMENT_LIMIT, ERROR_INVALID_ADDRESS, ERROR_INVALID_PARAMETER,
        ERROR_NOT_ENOUGH_MEMORY,
    };
    use windows_sys::Win32::System::Memory::{
        VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_DECOMMIT, MEM_RELEASE, MEM_RESERVE,
        PAGE_NOACCESS, PAGE_READWRITE,
    };
    use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

    use super::classify;

    fn last_error() -> i32 {
        // SAFETY: no preconditions.
        let code = unsafe { GetLastError() };
        match code {
            ERROR_NOT_ENOUGH_MEMORY | ERROR_COMMITMENT_LIMIT => ENOMEM,
            ERROR_INVALID_PARAMETER | ERROR_INVALID_ADDRESS => EINVAL,
            _ => 0,
        }
    }

    /// The platform's minimum commit granularity in bytes.
    pub fn page_size() -> usize {
        // SAFETY: SYSTEM_INFO is plain data; GetSystemInfo fills it in.
        let mut info: SYSTEM_INFO = unsafe { mem::zeroed() };
        unsafe { GetSystemInfo(&mut info) };
        info.dwPageSize as usize
    }

    /// Reserve `size` bytes of address space with no access rights.
    pub fn reserve(size: usize) -> Result<NonNull<u8>, AllocationError> {
        if size == 0 {
            return Err(AllocationError::InvalidArgument);
        }
        // SAFETY: reserving at a system-chosen address.
        let mapped = unsafe { VirtualAlloc(ptr::null(), size, MEM_RESERVE, PAGE_NOACCESS) };
        NonNull::new(mapped.cast::<u8>())
            .ok_or_else(|| classify(last_error(), AllocationError::InvalidArgument))
    }

    /// Make `[ptr, ptr + size)` readable, writable and physically backed.
    ///
    /// # Safety
    ///
    /// The range must lie inside a live reservation from [`reserve`].
    pub unsafe fn commit(ptr: NonNull<u8>, size: usize) -> Result<(), AllocationError> {
        // SAFETY: caller guarantees the range is part of our reservation.
        let p = unsafe { VirtualAlloc(ptr.as_ptr().cast(), size, MEM_COMMIT, PAGE_READWRITE) };
        if p.is_null() {
            return Err(classify(last_error(), AllocationError::InvalidPointer));
        }
        Ok(())
    }

    /// Revoke access to `[ptr, ptr + size)` and hand its pages back.
    ///
    /// # Safety
    ///
    /// The range must lie inside a live reservation and must not be
    /// referenced afterwards until it is committed again.
    pub unsafe fn decommit(ptr: NonNull<u8>, size: usize) {
        // SAFETY: caller guarantees the range is part of our reservation.
        unsafe {
            VirtualFree(ptr.as_ptr().cast(), size, MEM_DECOMMIT);
        }
    }

    /// Unreserve the whole region.
    ///
    /// # Safety
    ///
    /// `ptr` must be the base of a reservation from [`reserve`], and nothing
    /// may reference it afterwards.
    pub unsafe fn release(ptr: NonNull<u8>, _size: usize) {
        // SAFETY: MEM_RELEASE requires size 0 and the reservation base.
        unsafe {
            VirtualFree(ptr.as_ptr().cast(), 0, MEM_RELEASE);
        }
    }

    pub(super) const ENOMEM: i32 = 12;
    pub(super) const EAGAIN: i32 = 11;
    pub(super) const EINVAL: i32 = 22;
}

/// Map an OS error number to the allocation taxonomy.
///
/// `invalid` is what an "invalid argument" report means for the calling
/// operation: a bad size for `reserve`, a bad address for `commit`.
fn classify(errno: i32, invalid: AllocationError) -> AllocationError {
    match errno {
        imp::ENOMEM | imp::EAGAIN => AllocationError::OutOfMemory,
        imp::EINVAL => invalid,
        _ => AllocationError::OutOfMemory,
    }
}

/// A reservation that is released on drop unless disarmed.
///
/// Used while an arena is being set up so a failed header commit does not
/// leak address space.
pub(crate) struct Reservation {
    base: NonNull<u8>,
    size: usize,
}

impl Reservation {
    pub(crate) fn new(size: usize) -> Result<Self, AllocationError> {
        Ok(Self {
            base: reserve(size)?,
            size,
        })
    }

    pub(crate) fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Give up ownership; the caller becomes responsible for [`release`].
    pub(crate) fn into_raw(self) -> NonNull<u8> {
        let base = self.base;
        std::mem::forget(self);
        base
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        // SAFETY: we own this reservation and nothing else references it.
        unsafe { release(self.base, self.size) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_power_of_two() {
        let page = page_size();
        assert!(page >= 4096);
        assert!(page.is_power_of_two());
    }

    #[test]
    fn reserve_commit_write_decommit_release() {
        let page = page_size();
        let size = page * 8;
        let base = reserve(size).unwrap();
        unsafe {
            commit(base, page * 2).unwrap();
            base.as_ptr().write(0xAB);
            base.as_ptr().add(page * 2 - 1).write(0xCD);
            assert_eq!(base.as_ptr().read(), 0xAB);
            decommit(base, page * 2);
            commit(base, page).unwrap();
            #[cfg(target_os = "linux")]
            assert_eq!(base.as_ptr().read(), 0, "MADV_DONTNEED pages come back zeroed");
            release(base, size);
        }
    }

    #[test]
    fn zero_reserve_is_invalid_argument() {
        assert_eq!(reserve(0).unwrap_err(), AllocationError::InvalidArgument);
    }

    #[test]
    fn classify_maps_errno() {
        assert_eq!(
            classify(imp::ENOMEM, AllocationError::InvalidArgument),
            AllocationError::OutOfMemory
        );
        assert_eq!(
            classify(imp::EINVAL, AllocationError::InvalidPointer),
            AllocationError::InvalidPointer
        );
    }

    #[test]
    fn reservation_guard_releases() {
        let guard = Reservation::new(page_size() * 4).unwrap();
        assert_eq!(guard.base().as_ptr() as usize % page_size(), 0);
        drop(guard);
    }
}
