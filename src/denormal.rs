//! Per-thread denormal-as-zero floating point control.
//!
//! The flush-to-zero / denormals-are-zero bits live in a per-hardware-thread
//! control register (MXCSR on x86, FPCR on aarch64), so this must run inside
//! every worker's startup routine; setting it once on the spawning thread
//! would only affect that thread.

#[cfg(target_arch = "x86_64")]
pub(crate) fn set_denormal_as_zero() {
    // MXCSR bit 15 = flush-to-zero, bit 6 = denormals-are-zero
    const FTZ_DAZ: u32 = (1 << 15) | (1 << 6);
    let mut csr: u32 = 0;
    unsafe {
        core::arch::asm!("stmxcsr [{0}]", in(reg) &mut csr as *mut u32, options(nostack));
        csr |= FTZ_DAZ;
        core::arch::asm!("ldmxcsr [{0}]", in(reg) &csr as *const u32, options(nostack, readonly));
    }
}

#[cfg(target_arch = "aarch64")]
pub(crate) fn set_denormal_as_zero() {
    // FPCR bit 24 = FZ, flush denormalized inputs and outputs to zero
    const FZ: u64 = 1 << 24;
    let mut fpcr: u64;
    unsafe {
        core::arch::asm!("mrs {0}, fpcr", out(reg) fpcr, options(nomem, nostack));
        fpcr |= FZ;
        core::arch::asm!("msr fpcr, {0}", in(reg) fpcr, options(nomem, nostack));
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
pub(crate) fn set_denormal_as_zero() {}
