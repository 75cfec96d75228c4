use time::{Date, OffsetDateTime};
use uuid::Uuid;

pub const NAME_MAX_LEN: usize = 55;

/// A field whose values come from a closed list of `(code, label)` pairs.
///
/// The code is what gets stored and sent over the wire, the label is what people see.
pub trait Choice: Copy + Default + Eq + Send + Sync + 'static {
    const CHOICES: &'static [(&'static str, &'static str)];

    fn code(self) -> &'static str;
    fn label(self) -> &'static str;
    fn from_code(code: &str) -> Option<Self>;
}

macro_rules! choice {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => ($code:literal, $label:literal)),+ $(,)?
        }
        default = $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl Choice for $name {
            const CHOICES: &'static [(&'static str, &'static str)] = &[$(($code, $label)),+];

            fn code(self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }

            fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }

            fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }
    };
}

choice! {
    pub enum Gender {
        Male => ("M", "Male"),
        Female => ("F", "Female"),
    }
    default = Male
}

choice! {
    pub enum AcademicLevel {
        Primary1 => ("p1", "Primary 1"),
        Primary2 => ("p2", "Primary 2"),
        Primary3 => ("p3", "Primary 3"),
        Primary4 => ("p4", "Primary 4"),
        Primary5 => ("p5", "Primary 5"),
        Primary6 => ("p6", "Primary 6"),
    }
    default = Primary1
}

choice! {
    pub enum EnrolledStatus {
        Active => ("Active", "Active"),
        Dismissed => ("dismissed", "Dismissed"),
        Transferred => ("transferred", "Transferred"),
        Graduated => ("graduated", "Graduated"),
        Other => ("other", "Other"),
    }
    default = Active
}

/// Every field a person can set on a student, in form order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    FirstName,
    LastName,
    BirthDate,
    Gender,
    CurrentAcademicLevel,
    EnrolledStatus,
    Photo,
}

#[derive(Debug, Copy, Clone)]
pub enum FieldKind {
    Text { max_len: usize },
    Date,
    Choice(&'static [(&'static str, &'static str)]),
    Image { accept: &'static str },
}

#[derive(Debug, Copy, Clone)]
pub struct FieldSpec {
    pub field: Field,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

/// The student schema. Form rendering, validation and the SQL column list are all driven from
/// this, in this order, which must match the declaration order of [`Field`].
pub static STUDENT_FIELDS: [FieldSpec; 7] = [
    FieldSpec {
        field: Field::FirstName,
        label: "First Name",
        kind: FieldKind::Text {
            max_len: NAME_MAX_LEN,
        },
        required: true,
    },
    FieldSpec {
        field: Field::LastName,
        label: "Last Name",
        kind: FieldKind::Text {
            max_len: NAME_MAX_LEN,
        },
        required: true,
    },
    FieldSpec {
        field: Field::BirthDate,
        label: "Birth Date",
        kind: FieldKind::Date,
        required: true,
    },
    FieldSpec {
        field: Field::Gender,
        label: "Gender",
        kind: FieldKind::Choice(Gender::CHOICES),
        required: true,
    },
    FieldSpec {
        field: Field::CurrentAcademicLevel,
        label: "Current Academic Level",
        kind: FieldKind::Choice(AcademicLevel::CHOICES),
        required: true,
    },
    FieldSpec {
        field: Field::EnrolledStatus,
        label: "Enrolled Status",
        kind: FieldKind::Choice(EnrolledStatus::CHOICES),
        required: true,
    },
    FieldSpec {
        field: Field::Photo,
        label: "Photo",
        kind: FieldKind::Image {
            accept: "image/jpeg,image/png",
        },
        required: false,
    },
];

impl Field {
    ///form field name and database column name
    pub const fn name(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::BirthDate => "birth_date",
            Self::Gender => "gender",
            Self::CurrentAcademicLevel => "current_academic_level",
            Self::EnrolledStatus => "enrolled_status",
            Self::Photo => "photo",
        }
    }

    pub fn spec(self) -> &'static FieldSpec {
        &STUDENT_FIELDS[self as usize]
    }
}

/// Everything about a student that isn't assigned by the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentFields {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Date,
    pub gender: Gender,
    pub current_academic_level: AcademicLevel,
    pub enrolled_status: EnrolledStatus,
    ///key of the stored image, eg. `students/photos/<uuid>.png`
    pub photo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Date,
    pub gender: Gender,
    pub current_academic_level: AcademicLevel,
    pub enrolled_status: EnrolledStatus,
    pub photo: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Student {
    pub fn new(id: Uuid, fields: StudentFields, now: OffsetDateTime) -> Self {
        let StudentFields {
            first_name,
            last_name,
            birth_date,
            gender,
            current_academic_level,
            enrolled_status,
            photo,
        } = fields;

        Self {
            id,
            first_name,
            last_name,
            birth_date,
            gender,
            current_academic_level,
            enrolled_status,
            photo,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn fields(&self) -> StudentFields {
        StudentFields {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            birth_date: self.birth_date,
            gender: self.gender,
            current_academic_level: self.current_academic_level,
            enrolled_status: self.enrolled_status,
            photo: self.photo.clone(),
        }
    }

    pub fn name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn age(&self) -> i32 {
        self.age_on(today())
    }

    pub fn age_on(&self, today: Date) -> i32 {
        age_between(self.birth_date, today)
    }

    pub fn profile_url(&self) -> String {
        format!("/students/{}/", self.id)
    }
}

pub fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

///whole years from `birth_date` to `today`
pub fn age_between(birth_date: Date, today: Date) -> i32 {
    let had_birthday_this_year =
        (u8::from(today.month()), today.day()) >= (u8::from(birth_date.month()), birth_date.day());
    today.year() - birth_date.year() - i32::from(!had_birthday_this_year)
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum StudentOrder {
    #[default]
    NewestFirst,
    OldestFirst,
    LastName,
}

impl StudentOrder {
    pub const ALL: [Self; 3] = [Self::NewestFirst, Self::OldestFirst, Self::LastName];

    ///unknown values fall back to the default
    pub fn from_query(query: Option<&str>) -> Self {
        match query {
            Some("oldest") => Self::OldestFirst,
            Some("last_name") => Self::LastName,
            _ => Self::NewestFirst,
        }
    }

    pub const fn query(self) -> &'static str {
        match self {
            Self::NewestFirst => "newest",
            Self::OldestFirst => "oldest",
            Self::LastName => "last_name",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NewestFirst => "Newest first",
            Self::OldestFirst => "Oldest first",
            Self::LastName => "Last name",
        }
    }
}

#[cfg(test)]
pub fn ada_lovelace() -> StudentFields {
    StudentFields {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        birth_date: time::macros::date!(2010 - 01 - 01),
        gender: Gender::Female,
        current_academic_level: AcademicLevel::Primary3,
        enrolled_status: EnrolledStatus::Active,
        photo: None,
    }
}
