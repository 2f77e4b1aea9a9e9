//! Real device layer over the CUDA driver API.
//!
//! Uses `cudarc`'s raw driver bindings directly rather than its safe
//! context wrapper: the optimiser needs explicit context create/destroy
//! around external toolchain invocations, plus per-function attribute
//! queries that the safe API does not expose.

use std::ffi::CString;
use std::path::Path;
use std::ptr;

use cudarc::driver::sys as cuda_sys;
use parking_lot::Mutex;

use crate::device::{DeviceLayer, DeviceProps, KernelResources};
use crate::error::{BackendError, Result};
use crate::kernel::Kernel;

fn check(result: cuda_sys::CUresult, what: &str) -> Result<()> {
    if result == cuda_sys::CUresult::CUDA_SUCCESS {
        Ok(())
    } else {
        Err(BackendError::Driver(format!("{what} failed: {result:?}")))
    }
}

fn device_attribute(device: cuda_sys::CUdevice, attr: cuda_sys::CUdevice_attribute) -> Result<i32> {
    let mut value = 0i32;
    unsafe {
        check(
            cuda_sys::cuDeviceGetAttribute(&mut value, attr, device),
            "cuDeviceGetAttribute",
        )?;
    }
    Ok(value)
}

fn device_handle(device: usize) -> Result<cuda_sys::CUdevice> {
    let mut handle = cuda_sys::CUdevice::default();
    unsafe {
        check(
            cuda_sys::cuDeviceGet(&mut handle, device as i32),
            "cuDeviceGet",
        )?;
    }
    Ok(handle)
}

/// CUDA driver-backed [`DeviceLayer`].
pub struct CudaDriver {
    context: Mutex<Option<cuda_sys::CUcontext>>,
}

impl CudaDriver {
    /// Initializes the driver API.
    pub fn new() -> Result<Self> {
        unsafe {
            check(cuda_sys::cuInit(0), "cuInit")?;
        }
        Ok(Self {
            context: Mutex::new(None),
        })
    }

    fn current_context(&self) -> Result<cuda_sys::CUcontext> {
        (*self.context.lock())
            .ok_or_else(|| BackendError::Driver("no active device context".into()))
    }
}

impl DeviceLayer for CudaDriver {
    fn device_count(&self) -> Result<usize> {
        let mut count = 0i32;
        unsafe {
            check(cuda_sys::cuDeviceGetCount(&mut count), "cuDeviceGetCount")?;
        }
        Ok(count.max(0) as usize)
    }

    fn capabilities(&self, device: usize) -> Result<DeviceProps> {
        use cuda_sys::CUdevice_attribute as Attr;

        let handle = device_handle(device)?;

        let mut total_global_mem = 0usize;
        unsafe {
            check(
                cuda_sys::cuDeviceTotalMem_v2(&mut total_global_mem, handle),
                "cuDeviceTotalMem",
            )?;
        }

        Ok(DeviceProps {
            major: device_attribute(handle, Attr::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR)?
                as u32,
            minor: device_attribute(handle, Attr::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR)?
                as u32,
            max_threads_per_block: device_attribute(
                handle,
                Attr::CU_DEVICE_ATTRIBUTE_MAX_THREADS_PER_BLOCK,
            )? as usize,
            max_threads_per_multiprocessor: device_attribute(
                handle,
                Attr::CU_DEVICE_ATTRIBUTE_MAX_THREADS_PER_MULTIPROCESSOR,
            )? as usize,
            regs_per_block: device_attribute(
                handle,
                Attr::CU_DEVICE_ATTRIBUTE_MAX_REGISTERS_PER_BLOCK,
            )? as usize,
            shared_mem_per_multiprocessor: device_attribute(
                handle,
                Attr::CU_DEVICE_ATTRIBUTE_MAX_SHARED_MEMORY_PER_MULTIPROCESSOR,
            )? as usize,
            multiprocessor_count: device_attribute(
                handle,
                Attr::CU_DEVICE_ATTRIBUTE_MULTIPROCESSOR_COUNT,
            )? as usize,
            total_global_mem,
        })
    }

    fn acquire_context(&self, device: usize) -> Result<()> {
        let handle = device_handle(device)?;
        let mut context: cuda_sys::CUcontext = ptr::null_mut();
        unsafe {
            check(
                cuda_sys::cuCtxCreate_v2(&mut context, 0, handle),
                "cuCtxCreate",
            )?;
        }
        *self.context.lock() = Some(context);
        Ok(())
    }

    fn make_current(&self) -> Result<()> {
        let context = self.current_context()?;
        unsafe { check(cuda_sys::cuCtxSetCurrent(context), "cuCtxSetCurrent") }
    }

    fn release_context(&self) -> Result<()> {
        let context = self
            .context
            .lock()
            .take()
            .ok_or_else(|| BackendError::Driver("no active device context".into()))?;
        unsafe { check(cuda_sys::cuCtxDestroy_v2(context), "cuCtxDestroy") }
    }

    fn probe_module(&self, binary: &Path) -> Result<Vec<(Kernel, KernelResources)>> {
        let path = CString::new(binary.to_string_lossy().as_bytes())
            .map_err(|e| BackendError::Driver(format!("invalid module path: {e}")))?;

        let mut module: cuda_sys::CUmodule = ptr::null_mut();
        unsafe {
            check(
                cuda_sys::cuModuleLoad(&mut module, path.as_ptr()),
                "cuModuleLoad",
            )?;
        }

        let probe = || -> Result<Vec<(Kernel, KernelResources)>> {
            let mut found = Vec::new();
            for kernel in Kernel::ALL {
                let name = CString::new(kernel.entry_point())
                    .map_err(|e| BackendError::Driver(format!("invalid entry point: {e}")))?;

                let mut function: cuda_sys::CUfunction = ptr::null_mut();
                let result = unsafe {
                    cuda_sys::cuModuleGetFunction(&mut function, module, name.as_ptr())
                };
                // Absence of an entry point is expected: not every kernel
                // kind appears in every module.
                if result != cuda_sys::CUresult::CUDA_SUCCESS {
                    continue;
                }

                found.push((kernel, function_resources(function)?));
            }
            Ok(found)
        };
        let found = probe();

        unsafe {
            let _ = cuda_sys::cuModuleUnload(module);
        }
        found
    }
}

fn function_resources(function: cuda_sys::CUfunction) -> Result<KernelResources> {
    use cuda_sys::CUfunction_attribute as Attr;

    let mut registers = 0i32;
    let mut shared_mem_bytes = 0i32;
    unsafe {
        check(
            cuda_sys::cuFuncGetAttribute(&mut registers, Attr::CU_FUNC_ATTRIBUTE_NUM_REGS, function),
            "cuFuncGetAttribute(NUM_REGS)",
        )?;
        check(
            cuda_sys::cuFuncGetAttribute(
                &mut shared_mem_bytes,
                Attr::CU_FUNC_ATTRIBUTE_SHARED_SIZE_BYTES,
                function,
            ),
            "cuFuncGetAttribute(SHARED_SIZE_BYTES)",
        )?;
    }

    Ok(KernelResources {
        registers: registers.max(0) as usize,
        shared_mem_bytes: shared_mem_bytes.max(0) as usize,
    })
}

impl Drop for CudaDriver {
    fn drop(&mut self) {
        // Destroy any leftover context (ignore errors during cleanup).
        if let Some(context) = self.context.lock().take() {
            unsafe {
                let _ = cuda_sys::cuCtxDestroy_v2(context);
            }
        }
    }
}
