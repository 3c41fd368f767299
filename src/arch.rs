/// Stop execution on this core indefinitely. The firmware has no way of unloading a module that
/// failed half-way through, so there is nothing to return to.
#[inline(always)]
pub fn halt_core() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
