//! Extract translatable text from CMS pages, translate it through a language
//! model with a resumable checkpoint file, and patch the result back.

pub mod checkpoint;
pub mod cms;
pub mod commands;
pub mod config;
pub mod extract;
pub mod holiday;
pub mod language;
pub mod mapping;
pub mod path;
pub mod pipeline;
pub mod reinject;
pub mod retry;
pub mod rules;
pub mod translator;
pub mod validator;
