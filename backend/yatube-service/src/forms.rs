//! HTML form binding and validation
//!
//! Forms are plain serde structs bound from urlencoded or multipart bodies.
//! Field rules that need no storage access live here (validator derive plus a
//! few hand checks); rules that need the repository (unknown group, taken
//! username) are added by the services. Errors are collected per field and
//! handed back to the template, never raised as `AppError`.

use crate::error::{AppError, Result};
use actix_multipart::Multipart;
use actix_web::dev::UrlEncoded;
use actix_web::{http::header, web, HttpRequest};
use futures::TryStreamExt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationErrors};

/// Key for errors that belong to the form as a whole
pub const NON_FIELD_ERRORS: &str = "__all__";

pub const MSG_REQUIRED: &str = "Обязательное поле.";
pub const MSG_INVALID_CHOICE: &str =
    "Выберите корректный вариант. Вашего варианта нет среди допустимых значений.";
pub const MSG_INVALID_IMAGE: &str =
    "Загрузите правильное изображение. Файл, который вы загрузили, поврежден или не является изображением.";
pub const MSG_IMAGE_TOO_LARGE: &str = "Файл слишком большой.";
pub const MSG_TEXT_TOO_LARGE: &str = "Текст слишком длинный.";
pub const MSG_PASSWORD_MISMATCH: &str = "Введенные пароли не совпадают.";
pub const MSG_USERNAME_TAKEN: &str = "Пользователь с таким именем уже существует.";
pub const MSG_INVALID_USERNAME: &str =
    "Введите правильное имя пользователя. Оно может содержать только буквы, цифры и знаки @/./+/-/_.";
pub const MSG_INVALID_LOGIN: &str =
    "Пожалуйста, введите правильные имя пользователя и пароль. Оба поля могут быть чувствительны к регистру.";

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username regex is valid"));

// ============================================================================
// Errors
// ============================================================================

/// Field name → messages, in field order
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> std::result::Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FormErrors::new();
        for (field, errs) in errors.field_errors() {
            for err in errs {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string());
                out.add(field.as_ref(), message);
            }
        }
        out
    }
}

fn validation_errors(form: &impl Validate) -> FormErrors {
    match form.validate() {
        Ok(()) => FormErrors::new(),
        Err(e) => e.into(),
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

// ============================================================================
// Uploads
// ============================================================================

/// File part of a multipart body
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
    /// Set when the part exceeded the upload limit; `bytes` is then truncated
    pub too_large: bool,
}

/// Image accepted by the post form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

/// Sniff the image format from the bytes; the filename is not trusted
pub fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    use image::ImageFormat;

    match image::guess_format(bytes).ok()? {
        ImageFormat::Gif => Some("gif"),
        ImageFormat::Png => Some("png"),
        ImageFormat::Jpeg => Some("jpg"),
        ImageFormat::WebP => Some("webp"),
        _ => None,
    }
}

// ============================================================================
// Post form
// ============================================================================

#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct PostForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Обязательное поле."))]
    pub text: String,

    /// Raw group id as submitted; empty means "no group"
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub group: Option<String>,

    #[serde(skip)]
    pub image: Option<UploadedFile>,

    /// Multipart `text` part went over the body limit
    #[serde(skip)]
    pub text_too_large: bool,
}

/// Post form after field-level checks
#[derive(Debug, Clone)]
pub struct CheckedPost {
    pub text: String,
    pub group_id: Option<i64>,
    pub image: Option<ImageUpload>,
}

impl PostForm {
    /// Unbound form pre-filled from an existing post (edit page)
    pub fn initial(text: &str, group_id: Option<i64>) -> Self {
        Self {
            text: text.to_string(),
            group: group_id.map(|id| id.to_string()),
            image: None,
            text_too_large: false,
        }
    }

    pub fn check(&mut self) -> std::result::Result<CheckedPost, FormErrors> {
        self.text = self.text.trim().to_string();
        let mut errors = validation_errors(self);
        if self.text_too_large {
            errors.add("text", MSG_TEXT_TOO_LARGE);
        }

        let group_id = match self.group.as_deref().map(str::trim) {
            None => None,
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("group", MSG_INVALID_CHOICE);
                    None
                }
            },
        };

        let image = match self.image.take() {
            None => None,
            Some(file) if file.too_large => {
                errors.add("image", MSG_IMAGE_TOO_LARGE);
                None
            }
            Some(file) => match sniff_image(&file.bytes) {
                Some(extension) => Some(ImageUpload {
                    bytes: file.bytes,
                    extension,
                }),
                None => {
                    errors.add("image", MSG_INVALID_IMAGE);
                    None
                }
            },
        };

        errors.into_result()?;
        Ok(CheckedPost {
            text: self.text.clone(),
            group_id,
            image,
        })
    }
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Bind an urlencoded body of up to `limit` bytes.
///
/// Form fields such as post text have no length rule of their own, so the
/// 16 KiB default of `web::Form` is replaced by the configured limit.
pub async fn read_urlencoded<T: DeserializeOwned + 'static>(
    req: &HttpRequest,
    payload: web::Payload,
    limit: usize,
) -> Result<T> {
    let mut payload = payload.into_inner();
    UrlEncoded::<T>::new(req, &mut payload)
        .limit(limit)
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

/// Bind a post form from either an urlencoded or a multipart body.
///
/// A part is kept only when it carries bytes; parts larger than
/// `max_upload_bytes` are drained and flagged instead of buffered.
pub async fn read_post_form(
    req: &HttpRequest,
    payload: web::Payload,
    max_upload_bytes: usize,
) -> Result<PostForm> {
    if !is_multipart(req) {
        return read_urlencoded(req, payload, max_upload_bytes).await;
    }

    let mut multipart = Multipart::new(req.headers(), payload);
    let mut form = PostForm::default();

    while let Some(mut field) = multipart.try_next().await? {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut bytes = Vec::new();
        let mut too_large = false;
        while let Some(chunk) = field.try_next().await? {
            if too_large {
                continue;
            }
            if bytes.len() + chunk.len() > max_upload_bytes {
                too_large = true;
                continue;
            }
            bytes.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "text" if too_large => form.text_too_large = true,
            "text" => form.text = String::from_utf8_lossy(&bytes).into_owned(),
            "group" => {
                let raw = String::from_utf8_lossy(&bytes).trim().to_string();
                form.group = (!raw.is_empty()).then_some(raw);
            }
            "image" if !bytes.is_empty() || too_large => {
                form.image = Some(UploadedFile {
                    filename,
                    bytes,
                    too_large,
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

// ============================================================================
// Comment form
// ============================================================================

#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Обязательное поле."))]
    pub text: String,
}

impl CommentForm {
    pub fn check(&mut self) -> std::result::Result<String, FormErrors> {
        self.text = self.text.trim().to_string();
        validation_errors(self).into_result()?;
        Ok(self.text.clone())
    }
}

// ============================================================================
// Auth forms
// ============================================================================

#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct SignupForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 150, message = "Обязательное поле, не более 150 символов."))]
    pub username: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,

    #[serde(default, skip_serializing)]
    #[validate(length(min = 8, message = "Пароль должен содержать не менее 8 символов."))]
    pub password1: String,

    #[serde(default, skip_serializing)]
    pub password2: String,
}

#[derive(Debug, Clone)]
pub struct CheckedSignup {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl SignupForm {
    pub fn check(&mut self) -> std::result::Result<CheckedSignup, FormErrors> {
        self.username = self.username.trim().to_string();
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();

        let mut errors = validation_errors(self);
        if !self.username.is_empty() && !USERNAME_RE.is_match(&self.username) {
            errors.add("username", MSG_INVALID_USERNAME);
        }
        if self.password1 != self.password2 {
            errors.add("password2", MSG_PASSWORD_MISMATCH);
        }
        errors.into_result()?;

        Ok(CheckedSignup {
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            password: self.password1.clone(),
        })
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Обязательное поле."))]
    pub username: String,

    #[serde(default, skip_serializing)]
    #[validate(length(min = 1, message = "Обязательное поле."))]
    pub password: String,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub next: Option<String>,
}

impl LoginForm {
    pub fn check(&mut self) -> std::result::Result<(), FormErrors> {
        self.username = self.username.trim().to_string();
        validation_errors(self).into_result()
    }
}

/// Only same-site absolute paths are followed after login.
///
/// Browsers read `/\host` as `//host`, so a backslash in second position is
/// rejected along with control characters.
pub fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path) if is_local_path(path) => path.to_string(),
        _ => "/".to_string(),
    }
}

fn is_local_path(path: &str) -> bool {
    let mut chars = path.chars();
    chars.next() == Some('/')
        && !matches!(chars.next(), Some('/') | Some('\\'))
        && !path.chars().any(char::is_control)
}
