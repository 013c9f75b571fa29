//! macOS Mach task_info resident memory collection

use super::MemoryError;
use std::mem;

// Mach kernel types and constants (using C naming conventions)
#[allow(non_camel_case_types)]
mod types {
    pub type kern_return_t = libc::c_int;
    pub type mach_port_t = libc::c_uint;
    pub type task_flavor_t = libc::c_uint;
    pub type mach_msg_type_number_t = libc::c_uint;
    pub type integer_t = libc::c_int;
}

use types::*;

const KERN_SUCCESS: kern_return_t = 0;
const MACH_TASK_BASIC_INFO: task_flavor_t = 20;

#[allow(non_camel_case_types, dead_code)]
#[repr(C)]
#[derive(Debug, Copy, Clone, Default)]
struct time_value_t {
    seconds: integer_t,
    microseconds: integer_t,
}

#[allow(non_camel_case_types, dead_code)]
#[repr(C)]
#[derive(Debug, Copy, Clone, Default)]
struct mach_task_basic_info {
    virtual_size: u64,
    resident_size: u64,
    resident_size_max: u64,
    user_time: time_value_t,
    system_time: time_value_t,
    policy: integer_t,
    suspend_count: integer_t,
}

extern "C" {
    fn mach_task_self() -> mach_port_t;

    fn task_info(
        target_task: mach_port_t,
        flavor: task_flavor_t,
        task_info_out: *mut integer_t,
        task_info_outCnt: *mut mach_msg_type_number_t,
    ) -> kern_return_t;
}

pub(crate) fn resident_bytes() -> Result<u64, MemoryError> {
    let mut info = mach_task_basic_info::default();
    let mut count = (mem::size_of::<mach_task_basic_info>() / mem::size_of::<integer_t>())
        as mach_msg_type_number_t;

    let kr = unsafe {
        task_info(
            mach_task_self(),
            MACH_TASK_BASIC_INFO,
            &mut info as *mut mach_task_basic_info as *mut integer_t,
            &mut count,
        )
    };

    if kr != KERN_SUCCESS {
        return Err(MemoryError::Kernel { code: kr });
    }

    Ok(info.resident_size)
}
