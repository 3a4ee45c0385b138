//! Password prompts on the controlling terminal.
//!
//! Echo is disabled when stdin is a tty; piped stdin is read line by line,
//! which is what the integration tests rely on.

use secrecy::SecretString;
use std::io::IsTerminal;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("io error")]
    Io(#[from] io::Error),

    #[error("input cannot be empty")]
    Empty,

    #[error("passwords do not match")]
    Mismatch,
}

/// Ask once for an existing password.
pub fn prompt_password(label: &str) -> Result<SecretString, PromptError> {
    let value = read_secret_line(label)?;
    into_secret(value)
}

/// Ask for a new password twice and require both answers to agree.
pub fn prompt_new_password(label: &str, confirm_label: &str) -> Result<SecretString, PromptError> {
    let first = read_secret_line(label)?;
    if first.is_empty() {
        return Err(PromptError::Empty);
    }
    let confirm = read_secret_line(confirm_label)?;
    if first.as_str() != confirm.as_str() {
        return Err(PromptError::Mismatch);
    }
    into_secret(first)
}

pub fn prompt_master_password() -> Result<SecretString, PromptError> {
    prompt_password("Master password: ")
}

pub fn prompt_new_master_password() -> Result<SecretString, PromptError> {
    prompt_new_password("New master password: ", "Confirm master password: ")
}

pub fn prompt_entry_password(website: &str) -> Result<SecretString, PromptError> {
    prompt_password(&format!("Password for {website}: "))
}

fn into_secret(value: Zeroizing<String>) -> Result<SecretString, PromptError> {
    if value.is_empty() {
        return Err(PromptError::Empty);
    }
    Ok(SecretString::from(value.as_str().to_string()))
}

fn read_secret_line(prompt: &str) -> Result<Zeroizing<String>, PromptError> {
    eprint!("{prompt}");
    io::stderr().flush()?;

    #[cfg(unix)]
    if io::stdin().is_terminal() {
        return read_line_no_echo();
    }

    read_line_plain()
}

fn read_line_plain() -> Result<Zeroizing<String>, PromptError> {
    let mut line = Zeroizing::new(String::new());
    io::stdin().lock().read_line(&mut line)?;
    let kept = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(kept);
    Ok(line)
}

#[cfg(unix)]
fn read_line_no_echo() -> Result<Zeroizing<String>, PromptError> {
    use std::mem::MaybeUninit;
    use std::os::unix::io::AsRawFd;

    let fd = io::stdin().as_raw_fd();

    // SAFETY: `fd` is the process's stdin; termios is plain data that
    // tcgetattr fully initialises when it returns 0.
    let original = unsafe {
        let mut original = MaybeUninit::<libc::termios>::uninit();
        if libc::tcgetattr(fd, original.as_mut_ptr()) != 0 {
            return read_line_plain();
        }
        original.assume_init()
    };

    let mut silent = original;
    silent.c_lflag &= !(libc::ECHO | libc::ECHONL);
    // SAFETY: same fd, pointer to a live termios value.
    let active = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &silent) == 0 };
    let _restore = EchoGuard {
        fd,
        original,
        active,
    };

    let line = read_line_plain()?;
    eprintln!();
    Ok(line)
}

/// Restores the saved terminal mode, including on early return.
#[cfg(unix)]
struct EchoGuard {
    fd: i32,
    original: libc::termios,
    active: bool,
}

#[cfg(unix)]
impl Drop for EchoGuard {
    fn drop(&mut self) {
        if self.active {
            // SAFETY: restores the mode read from this fd in read_line_no_echo.
            unsafe {
                let _ = libc::tcsetattr(self.fd, libc::TCSANOW, &self.original);
            }
        }
    }
}
