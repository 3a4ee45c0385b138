pub mod codec;
pub mod crypto;
pub mod io;
pub mod naming;
pub mod registration;

mod ops;
mod prompt;

pub use naming::AccountPaths;
pub use ops::{
    DEFAULT_MIN_PASSWORD_LEN, DeleteFailure, Removal, Vault, VaultError, VaultOptions, account,
    delete_account_files,
};
pub use prompt::{
    PromptError, prompt_entry_password, prompt_master_password, prompt_new_master_password,
    prompt_password,
};
pub use registration::register;
