use crate::{
    data::{
        photo::ImageUpload,
        student::{
            AcademicLevel, Choice, EnrolledStatus, Field, FieldKind, Gender, Student,
            StudentFields,
        },
    },
    error::{MultipartSnafu, SatchelResult},
};
use axum::extract::Multipart;
use snafu::ResultExt;
use std::collections::HashMap;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

pub const CLEAR_PHOTO_FIELD: &str = "photo_clear";
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// What came in from the browser, before any checking.
#[derive(Debug, Default, Clone)]
pub struct RawStudentForm {
    values: HashMap<String, String>,
    photo: Option<Vec<u8>>,
    clear_photo: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoChange {
    Keep,
    Clear,
    Replace(ImageUpload),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedStudent {
    ///`photo` is left as `None`, it gets filled in once `photo_change` has been dealt with
    pub fields: StudentFields,
    pub photo_change: PhotoChange,
}

/// Field-level messages, in the order they were found.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors(Vec<(Field, String)>);

impl FormErrors {
    pub fn push(&mut self, field: Field, message: impl Into<String>) {
        self.0.push((field, message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn for_field(&self, field: Field) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(move |(f, _)| *f == field)
            .map(|(_, message)| message.as_str())
    }

    #[cfg(test)]
    pub fn has(&self, field: Field) -> bool {
        self.for_field(field).next().is_some()
    }
}

impl RawStudentForm {
    pub async fn from_multipart(mut multipart: Multipart) -> SatchelResult<Self> {
        let mut form = Self::default();

        loop {
            let Some(field) = multipart.next_field().await.context(MultipartSnafu)? else {
                break;
            };
            let Some(name) = field.name().map(ToString::to_string) else {
                continue;
            };

            if name == Field::Photo.name() {
                let bytes = field.bytes().await.context(MultipartSnafu)?;
                //browsers send an empty part when no file was picked
                if !bytes.is_empty() {
                    form.photo = Some(bytes.to_vec());
                }
            } else if name == CLEAR_PHOTO_FIELD {
                let value = field.text().await.context(MultipartSnafu)?;
                form.clear_photo = !value.is_empty();
            } else {
                let value = field.text().await.context(MultipartSnafu)?;
                form.values.insert(name, value);
            }
        }

        Ok(form)
    }

    ///what a blank "add" form starts out with
    pub fn defaults() -> Self {
        let mut form = Self::default();
        form.set(Field::Gender, Gender::default().code());
        form.set(Field::CurrentAcademicLevel, AcademicLevel::default().code());
        form.set(Field::EnrolledStatus, EnrolledStatus::default().code());
        form
    }

    pub fn from_student(student: &Student) -> Self {
        let mut form = Self::default();
        form.set(Field::FirstName, &student.first_name);
        form.set(Field::LastName, &student.last_name);
        form.set(Field::BirthDate, format_date(student.birth_date));
        form.set(Field::Gender, student.gender.code());
        form.set(Field::CurrentAcademicLevel, student.current_academic_level.code());
        form.set(Field::EnrolledStatus, student.enrolled_status.code());
        form
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        self.values.insert(field.name().to_string(), value.into());
    }

    #[cfg(test)]
    pub fn with_photo(mut self, bytes: Vec<u8>) -> Self {
        self.photo = Some(bytes);
        self
    }

    #[cfg(test)]
    pub fn with_clear_photo(mut self) -> Self {
        self.clear_photo = true;
        self
    }

    pub fn value(&self, field: Field) -> &str {
        self.values
            .get(field.name())
            .map_or("", |value| value.as_str())
    }

    ///checks every field, rather than stopping at the first problem
    pub fn validate(&self) -> Result<ValidatedStudent, FormErrors> {
        let mut errors = FormErrors::default();

        let first_name = self.clean_text(Field::FirstName, &mut errors);
        let last_name = self.clean_text(Field::LastName, &mut errors);
        let birth_date = self.clean_date(Field::BirthDate, &mut errors);
        let gender = self.clean_choice::<Gender>(Field::Gender, &mut errors);
        let current_academic_level =
            self.clean_choice::<AcademicLevel>(Field::CurrentAcademicLevel, &mut errors);
        let enrolled_status = self.clean_choice::<EnrolledStatus>(Field::EnrolledStatus, &mut errors);
        let photo_change = self.clean_photo(&mut errors);

        match (
            first_name,
            last_name,
            birth_date,
            gender,
            current_academic_level,
            enrolled_status,
            photo_change,
        ) {
            (
                Some(first_name),
                Some(last_name),
                Some(birth_date),
                Some(gender),
                Some(current_academic_level),
                Some(enrolled_status),
                Some(photo_change),
            ) if errors.is_empty() => Ok(ValidatedStudent {
                fields: StudentFields {
                    first_name,
                    last_name,
                    birth_date,
                    gender,
                    current_academic_level,
                    enrolled_status,
                    photo: None,
                },
                photo_change,
            }),
            _ => Err(errors),
        }
    }

    fn clean_text(&self, field: Field, errors: &mut FormErrors) -> Option<String> {
        let spec = field.spec();
        let value = self.value(field).trim();

        if value.is_empty() {
            if spec.required {
                errors.push(field, "This field is required.");
            }
            return None;
        }

        if let FieldKind::Text { max_len } = spec.kind {
            let length = value.chars().count();
            if length > max_len {
                errors.push(
                    field,
                    format!(
                        "Ensure this value has at most {max_len} characters (it has {length})."
                    ),
                );
                return None;
            }
        }

        Some(value.to_string())
    }

    fn clean_date(&self, field: Field, errors: &mut FormErrors) -> Option<Date> {
        let value = self.value(field).trim();
        if value.is_empty() {
            errors.push(field, "This field is required.");
            return None;
        }

        let Ok(date) = Date::parse(value, DATE_FORMAT) else {
            errors.push(field, "Enter a valid date.");
            return None;
        };

        Some(date)
    }

    ///the default only seeds a fresh form, so a blank submission is a missing value like any other
    fn clean_choice<T: Choice>(&self, field: Field, errors: &mut FormErrors) -> Option<T> {
        let value = self.value(field).trim();
        if value.is_empty() {
            if field.spec().required {
                errors.push(field, "This field is required.");
                return None;
            }
            return Some(T::default());
        }

        let found = T::from_code(value);
        if found.is_none() {
            errors.push(
                field,
                format!("Select a valid choice. {value} is not one of the available choices."),
            );
        }
        found
    }

    fn clean_photo(&self, errors: &mut FormErrors) -> Option<PhotoChange> {
        match &self.photo {
            Some(bytes) => {
                let upload = ImageUpload::sniff(bytes.clone());
                if upload.is_none() {
                    errors.push(
                        Field::Photo,
                        "Upload a valid image. Only JPEG and PNG files are accepted.",
                    );
                }
                upload.map(PhotoChange::Replace)
            }
            None if self.clear_photo => Some(PhotoChange::Clear),
            None => Some(PhotoChange::Keep),
        }
    }
}
