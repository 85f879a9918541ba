use std::collections::HashSet;
use std::fmt;

// One graded assessment as rendered in the "last grades" widget.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Grade {
    pub identity: String,
    pub course: String,
    pub assessment_type: String,
    pub lecturer: String,
    pub assessment: String,
}

impl Grade {
    // Builds a grade from already trimmed cell texts, deriving its identity.
    pub fn new(course: &str, assessment_type: &str, lecturer: &str, assessment: &str) -> Self {
        Grade {
            identity: identity_of(course, assessment_type),
            course: course.to_string(),
            assessment_type: assessment_type.to_string(),
            lecturer: lecturer.to_string(),
            assessment: assessment.to_string(),
        }
    }
}

// Natural key of a grade: course and assessment type with all whitespace removed.
pub fn identity_of(course: &str, assessment_type: &str) -> String {
    course
        .chars()
        .chain(assessment_type.chars())
        .filter(|c| !c.is_whitespace())
        .collect()
}

// The full listing of grades for one user.
//
// Extraction order is kept so that differences come out in page order, but
// equality ignores it.
#[derive(Debug, Clone, Default)]
pub struct GradeSet {
    grades: Vec<Grade>,
}

impl GradeSet {
    pub fn len(&self) -> usize {
        self.grades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }

    pub fn as_slice(&self) -> &[Grade] {
        &self.grades
    }

    pub fn identities(&self) -> HashSet<&str> {
        self.grades.iter().map(|g| g.identity.as_str()).collect()
    }

    // Grades of `self` whose identity does not appear in `known`, in order.
    pub fn difference(&self, known: &GradeSet) -> GradeSet {
        let known = known.identities();
        self.grades
            .iter()
            .filter(|g| !known.contains(g.identity.as_str()))
            .cloned()
            .collect()
    }
}

impl PartialEq for GradeSet {
    fn eq(&self, other: &Self) -> bool {
        let mut ours: Vec<&Grade> = self.grades.iter().collect();
        let mut theirs: Vec<&Grade> = other.grades.iter().collect();
        ours.sort();
        theirs.sort();
        ours == theirs
    }
}

impl Eq for GradeSet {}

impl FromIterator<Grade> for GradeSet {
    fn from_iter<I: IntoIterator<Item = Grade>>(iter: I) -> Self {
        GradeSet {
            grades: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for GradeSet {
    type Item = Grade;
    type IntoIter = std::vec::IntoIter<Grade>;

    fn into_iter(self) -> Self::IntoIter {
        self.grades.into_iter()
    }
}

impl<'a> IntoIterator for &'a GradeSet {
    type Item = &'a Grade;
    type IntoIter = std::slice::Iter<'a, Grade>;

    fn into_iter(self) -> Self::IntoIter {
        self.grades.iter()
    }
}

// Portal login. The password is kept out of `Debug` output.
#[derive(Clone)]
pub struct Credential {
    pub username: String,
    password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credential {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
