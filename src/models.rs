use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::*;
use crate::utils::time::{serialize_clock, serialize_iso};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub subscription_tier: Option<String>,
    pub is_verified: bool,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub specialty: Option<String>,
    pub specialties: serde_json::Value,
    pub experiences: serde_json::Value,
    pub location: Option<String>,
    pub registration: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub subscription_tier: Option<String>,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub specialties: serde_json::Value,
    pub experiences: serde_json::Value,
    pub location: Option<String>,
    pub registration: Option<String>,
}

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = jobs)]
#[diesel(belongs_to(User, foreign_key = hospital_id))]
pub struct Job {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_clock")]
    pub start_time: NaiveTime,
    #[serde(serialize_with = "serialize_clock")]
    pub end_time: NaiveTime,
    pub status: String,
    #[serde(serialize_with = "serialize_iso")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = jobs)]
pub struct NewJob {
    pub id: Uuid,
    pub hospital_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = applications)]
#[diesel(belongs_to(Job))]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub doctor_id: Uuid,
    pub status: String,
    #[serde(serialize_with = "serialize_iso")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = applications)]
pub struct NewApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    pub doctor_id: Uuid,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub is_read: bool,
    #[serde(serialize_with = "serialize_iso")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = documents)]
pub struct Document {
    pub id: Uuid,
    pub uploader_id: Uuid,
    pub user_id: Uuid,
    pub file_url: String,
    pub file_name: String,
    pub month: String,
    #[serde(serialize_with = "serialize_iso")]
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocument {
    pub id: Uuid,
    pub uploader_id: Uuid,
    pub user_id: Uuid,
    pub file_url: String,
    pub file_name: String,
    pub month: String,
}
