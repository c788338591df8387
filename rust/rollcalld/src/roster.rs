use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::model::{AttendanceRecord, AttendanceStatus, Class, Student};

/// Everything the workspace persists. Vec order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    #[serde(default)]
    pub classes: Vec<Class>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub attendance_records: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct StudentPatch {
    pub name: Option<String>,
    pub external_id: Option<String>,
    pub class_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct DeletedClass {
    pub class: Class,
    pub student_ids: Vec<String>,
    pub record_count: usize,
}

fn required(value: &str, field: &str) -> CoreResult<String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(CoreError::invalid_argument(format!(
            "{} must not be empty",
            field
        )));
    }
    Ok(v.to_string())
}

fn clean_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

impl Roster {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.students.is_empty() && self.attendance_records.is_empty()
    }

    pub fn class(&self, class_id: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.id == class_id)
    }

    pub fn student(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == student_id)
    }

    pub fn student_mut(&mut self, student_id: &str) -> Option<&mut Student> {
        self.students.iter_mut().find(|s| s.id == student_id)
    }

    /// Students of one class in insertion order.
    pub fn students_in_class(&self, class_id: &str) -> Vec<&Student> {
        self.students
            .iter()
            .filter(|s| s.class_id == class_id)
            .collect()
    }

    pub fn student_count(&self, class_id: &str) -> usize {
        self.students.iter().filter(|s| s.class_id == class_id).count()
    }

    pub fn records_for<'a>(
        &'a self,
        student_id: &'a str,
    ) -> impl Iterator<Item = &'a AttendanceRecord> + 'a {
        self.attendance_records
            .iter()
            .filter(move |r| r.student_id == student_id)
    }

    fn external_id_taken(&self, external_id: &str, except: Option<&str>) -> bool {
        self.students
            .iter()
            .any(|s| s.external_id == external_id && Some(s.id.as_str()) != except)
    }

    pub fn create_class(&mut self, name: &str, description: Option<&str>) -> CoreResult<Class> {
        let class = Class {
            id: Uuid::new_v4().to_string(),
            name: required(name, "name")?,
            description: clean_description(description),
        };
        self.classes.push(class.clone());
        Ok(class)
    }

    pub fn update_class(
        &mut self,
        class_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> CoreResult<Class> {
        let name = required(name, "name")?;
        let class = self
            .classes
            .iter_mut()
            .find(|c| c.id == class_id)
            .ok_or_else(|| CoreError::not_found("class not found"))?;
        class.name = name;
        class.description = clean_description(description);
        Ok(class.clone())
    }

    /// Remove a class with its students and their attendance history.
    pub fn delete_class(&mut self, class_id: &str) -> CoreResult<DeletedClass> {
        let pos = self
            .classes
            .iter()
            .position(|c| c.id == class_id)
            .ok_or_else(|| CoreError::not_found("class not found"))?;
        let class = self.classes.remove(pos);

        let student_ids: Vec<String> = self
            .students
            .iter()
            .filter(|s| s.class_id == class_id)
            .map(|s| s.id.clone())
            .collect();
        self.students.retain(|s| s.class_id != class_id);

        let before = self.attendance_records.len();
        self.attendance_records.retain(|r| r.class_id != class_id);
        let record_count = before - self.attendance_records.len();

        Ok(DeletedClass {
            class,
            student_ids,
            record_count,
        })
    }

    pub fn create_student(
        &mut self,
        class_id: &str,
        name: &str,
        external_id: &str,
    ) -> CoreResult<Student> {
        if self.class(class_id).is_none() {
            return Err(CoreError::not_found("class not found"));
        }
        let name = required(name, "name")?;
        let external_id = required(external_id, "externalId")?;
        if self.external_id_taken(&external_id, None) {
            return Err(CoreError::invalid_argument(format!(
                "externalId {} already exists",
                external_id
            )));
        }
        let student = Student::new(Uuid::new_v4().to_string(), external_id, name, class_id);
        self.students.push(student.clone());
        Ok(student)
    }

    pub fn update_student(&mut self, student_id: &str, patch: StudentPatch) -> CoreResult<Student> {
        if self.student(student_id).is_none() {
            return Err(CoreError::not_found("student not found"));
        }
        let name = patch.name.as_deref().map(|n| required(n, "name")).transpose()?;
        let external_id = patch
            .external_id
            .as_deref()
            .map(|e| required(e, "externalId"))
            .transpose()?;
        if let Some(ext) = external_id.as_deref() {
            if self.external_id_taken(ext, Some(student_id)) {
                return Err(CoreError::invalid_argument(format!(
                    "externalId {} is used by another student",
                    ext
                )));
            }
        }
        if let Some(cid) = patch.class_id.as_deref() {
            if self.class(cid).is_none() {
                return Err(CoreError::not_found("class not found"));
            }
        }

        let Some(student) = self.student_mut(student_id) else {
            return Err(CoreError::not_found("student not found"));
        };
        if let Some(n) = name {
            student.name = n;
        }
        if let Some(e) = external_id {
            student.external_id = e;
        }
        if let Some(cid) = patch.class_id {
            student.class_id = cid;
        }
        Ok(student.clone())
    }

    /// Attendance history stays in the log; only the student row goes.
    pub fn delete_student(&mut self, student_id: &str) -> CoreResult<Student> {
        let pos = self
            .students
            .iter()
            .position(|s| s.id == student_id)
            .ok_or_else(|| CoreError::not_found("student not found"))?;
        Ok(self.students.remove(pos))
    }

    /// Bulk add `(name, externalId)` rows; blank rows and taken ids are skipped.
    pub fn import_students<I>(&mut self, class_id: &str, rows: I) -> CoreResult<ImportSummary>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        if self.class(class_id).is_none() {
            return Err(CoreError::not_found("class not found"));
        }
        let mut summary = ImportSummary::default();
        for (name, external_id) in rows {
            let (name, external_id) = (name.trim(), external_id.trim());
            if name.is_empty()
                || external_id.is_empty()
                || self.external_id_taken(external_id, None)
            {
                summary.skipped += 1;
                continue;
            }
            self.students.push(Student::new(
                Uuid::new_v4().to_string(),
                external_id,
                name,
                class_id,
            ));
            summary.imported += 1;
        }
        Ok(summary)
    }

    /// Zero every student's score and counters and drop the class's history.
    pub fn reset_class_data(&mut self, class_id: &str) -> CoreResult<usize> {
        if self.class(class_id).is_none() {
            return Err(CoreError::not_found("class not found"));
        }
        let mut count = 0;
        for s in self.students.iter_mut().filter(|s| s.class_id == class_id) {
            s.reset_progress();
            count += 1;
        }
        self.attendance_records.retain(|r| r.class_id != class_id);
        Ok(count)
    }

    pub fn reset_statuses<'a, I>(&mut self, student_ids: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for id in student_ids {
            if let Some(s) = self.student_mut(id) {
                s.status = AttendanceStatus::Unknown;
            }
        }
    }
}
