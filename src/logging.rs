//! Kernel log on top of the firmware console

use core::ffi::CStr;
use core::fmt::Write;
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use snk::{KernelServices, SnkKernel};

/// Most verbose level that is forwarded to the firmware console.
pub const MAX_LEVEL: LevelFilter = LevelFilter::Info;

/// Size of the line buffer, including the trailing newline and NUL. Longer messages are cut off.
pub const LINE_CAPACITY: usize = 160;

/// Global instance of the kernel logger. It lives in the BSS, so the firmware console can only be
/// attached once the BSS has been cleared.
static LOGGER: KernelLog = KernelLog {
    kernel: AtomicPtr::new(ptr::null_mut()),
};

/// Route the `log` macros to the print service of `kernel`.
pub fn initialize_kernel_log(kernel: &'static SnkKernel) -> Result<(), SetLoggerError> {
    LOGGER
        .kernel
        .store(ptr::from_ref(kernel).cast_mut(), Ordering::Release);
    log::set_logger(&LOGGER).map(|()| log::set_max_level(MAX_LEVEL))
}

struct KernelLog {
    kernel: AtomicPtr<SnkKernel>,
}

impl Log for KernelLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= MAX_LEVEL
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // SAFETY: Only ever set from a `&'static SnkKernel`.
        let Some(kernel) = (unsafe { self.kernel.load(Ordering::Acquire).as_ref() }) else {
            return;
        };

        let mut line = LogLine::new();
        let _ = write!(&mut line, "veth: {}", record.args());
        kernel.print_str(line.terminate());
    }

    fn flush(&self) {}
}

/// Fixed-size, truncating buffer for a single line of log output.
struct LogLine {
    buffer: heapless::String<LINE_CAPACITY>,
}

impl LogLine {
    fn new() -> Self {
        Self {
            buffer: heapless::String::new(),
        }
    }

    /// Append the newline and NUL terminator for which space is always kept free.
    fn terminate(&mut self) -> &CStr {
        let _ = self.buffer.push_str("\n\0");
        CStr::from_bytes_until_nul(self.buffer.as_bytes()).unwrap_or(c"\n")
    }
}

impl Write for LogLine {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for c in s.chars() {
            if self.buffer.len() + c.len_utf8() > LINE_CAPACITY - 2 {
                break;
            }
            self.buffer.push(c).map_err(|_| core::fmt::Error)?;
        }
        Ok(())
    }
}
