pub mod fat16;
pub mod fd;

use spin::Mutex;

use self::fat16::Fat16;

pub static FS: Mutex<Fat16> = Mutex::new(Fat16::new());

pub fn init() {
    match FS.lock().init() {
        Ok(()) => log::info!("fat16: volume mounted"),
        Err(e) => log::error!("fat16: mount failed: {:?}", e),
    }
}
