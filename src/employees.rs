use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::store::Database;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmployeeStatus {
    #[default]
    Active,
    #[serde(rename = "On Leave")]
    OnLeave,
    Terminated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub position: String,
    pub department: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub status: EmployeeStatus,
    pub date_hired: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of a create request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub position: String,
    pub department: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub status: EmployeeStatus,
    pub date_hired: Option<NaiveDate>,
}

/// Body of an update request; absent fields stay as they are
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub status: Option<EmployeeStatus>,
    pub date_hired: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeFilter {
    pub department: Option<String>,
    pub status: Option<EmployeeStatus>,
}

impl Employee {
    fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("name is required"));
        }
        if !self.email.contains('@') {
            return Err(AppError::validation("invalid email address"));
        }
        if self.position.trim().is_empty() {
            return Err(AppError::validation("position is required"));
        }
        if self.department.trim().is_empty() {
            return Err(AppError::validation("department is required"));
        }
        Ok(())
    }
}

pub fn create(db: &mut Database, input: NewEmployee, now: DateTime<Utc>) -> AppResult<Employee> {
    let employee = Employee {
        id: uuid::Uuid::new_v4().to_string(),
        name: input.name.trim().to_string(),
        email: input.email.trim().to_lowercase(),
        phone: input.phone,
        position: input.position.trim().to_string(),
        department: input.department.trim().to_string(),
        location: input.location,
        status: input.status,
        date_hired: input.date_hired,
        created_at: now,
        updated_at: now,
    };
    employee.validate()?;
    if db.employees.iter().any(|e| e.email == employee.email) {
        return Err(AppError::Conflict(format!(
            "an employee with email {} already exists",
            employee.email
        )));
    }
    db.employees.push(employee.clone());
    Ok(employee)
}

pub fn get<'a>(db: &'a Database, id: &str) -> AppResult<&'a Employee> {
    db.employees
        .iter()
        .find(|e| e.id == id)
        .ok_or_else(|| AppError::not_found("employee"))
}

pub fn list(db: &Database, filter: &EmployeeFilter) -> Vec<Employee> {
    db.employees
        .iter()
        .filter(|e| {
            if let Some(ref d) = filter.department {
                if !e.department.eq_ignore_ascii_case(d) {
                    return false;
                }
            }
            if let Some(s) = filter.status {
                if e.status != s {
                    return false;
                }
            }
            true
        })
        .cloned()
        .collect()
}

pub fn update(
    db: &mut Database,
    id: &str,
    patch: EmployeePatch,
    now: DateTime<Utc>,
) -> AppResult<Employee> {
    if let Some(ref email) = patch.email {
        let email = email.trim().to_lowercase();
        if db.employees.iter().any(|e| e.id != id && e.email == email) {
            return Err(AppError::Conflict(format!(
                "an employee with email {} already exists",
                email
            )));
        }
    }

    let employee = db
        .employees
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or_else(|| AppError::not_found("employee"))?;

    let mut updated = employee.clone();
    if let Some(name) = patch.name {
        updated.name = name.trim().to_string();
    }
    if let Some(email) = patch.email {
        updated.email = email.trim().to_lowercase();
    }
    if let Some(phone) = patch.phone {
        updated.phone = phone;
    }
    if let Some(position) = patch.position {
        updated.position = position.trim().to_string();
    }
    if let Some(department) = patch.department {
        updated.department = department.trim().to_string();
    }
    if let Some(location) = patch.location {
        updated.location = location;
    }
    if let Some(status) = patch.status {
        updated.status = status;
    }
    if patch.date_hired.is_some() {
        updated.date_hired = patch.date_hired;
    }
    updated.validate()?;
    updated.updated_at = now;

    *employee = updated.clone();
    Ok(updated)
}

/// Remove an employee. Refused while reviews for them are on file.
pub fn delete(db: &mut Database, id: &str) -> AppResult<Employee> {
    let index = db
        .employees
        .iter()
        .position(|e| e.id == id)
        .ok_or_else(|| AppError::not_found("employee"))?;
    let reviews = db.reviews.iter().filter(|r| r.employee_id == id).count();
    if reviews > 0 {
        return Err(AppError::Conflict(format!(
            "employee has {} review(s) on file",
            reviews
        )));
    }
    Ok(db.employees.remove(index))
}

#[cfg(test)]
pub(crate) fn sample(name: &str, department: &str) -> NewEmployee {
    NewEmployee {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        phone: "+63 900 000 0000".to_string(),
        position: "Sales Associate".to_string(),
        department: department.to_string(),
        location: "Cebu".to_string(),
        status: EmployeeStatus::Active,
        date_hired: NaiveDate::from_ymd_opt(2022, 3, 1),
    }
}
