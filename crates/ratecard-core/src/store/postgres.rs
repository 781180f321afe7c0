//! PostgreSQL store
//!
//! Ratesheet, country and template persistence using SQLx and PostgreSQL.

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row};

use super::{RateStore, StoreTransaction};
use crate::schema::SCHEMA_SQL;
use crate::{
    ChargedRate, CountryRef, DestinationTemplate, RateBag, RateCategory, RateRecord,
    RatecardError, Result, StoredRate, Table, TableRow,
};

/// Scalar columns of `ratesheet_v2`, in bind order
const RATE_SCALAR_COLUMNS: [&str; 9] = [
    "tap_out",
    "bu_plmn_code",
    "tax_included",
    "tax_value",
    "tadig_plmn_code",
    "bearer_service_included",
    "start_date",
    "end_date",
    "currency",
];

const COUNTRY_COLUMNS: &str = "name, alpha_2, alpha_3, country_code, iso_3166_2, \
     region, sub_region, intermediate_region, \
     region_code, sub_region_code, intermediate_region_code, custom_name";

const TEMPLATE_COLUMNS: &str = r#"destination, area_code, rate, tariff_name, "date", rounding_rules, destination_type, setup_rate, calls_type, remarks"#;

/// Every bound column of `ratesheet_v2`: scalars, then (rate, interval) per category
fn rate_columns() -> Vec<&'static str> {
    let mut columns = RATE_SCALAR_COLUMNS.to_vec();
    for category in RateCategory::ALL {
        columns.push(category.rate_column());
        columns.push(category.interval_column());
    }
    columns
}

fn placeholders(from: usize, count: usize) -> String {
    (from..from + count)
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn bind_rate<'q>(
    query: Query<'q, Postgres, PgArguments>,
    record: &'q RateRecord,
) -> Query<'q, Postgres, PgArguments> {
    let mut query = query
        .bind(&record.tap_out)
        .bind(&record.bu_plmn_code)
        .bind(record.tax_included)
        .bind(record.tax_value)
        .bind(&record.tadig_plmn_code)
        .bind(record.bearer_service_included)
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(&record.currency);

    for category in RateCategory::ALL {
        let charge = record.charge(category);
        query = query.bind(charge.rate).bind(&charge.interval);
    }
    query
}

fn rate_from_row(row: &PgRow) -> std::result::Result<StoredRate, sqlx::Error> {
    let mut record = RateRecord {
        tap_out: row.try_get("tap_out")?,
        bu_plmn_code: row.try_get("bu_plmn_code")?,
        tax_included: row.try_get("tax_included")?,
        tax_value: row.try_get("tax_value")?,
        tadig_plmn_code: row.try_get("tadig_plmn_code")?,
        bearer_service_included: row.try_get("bearer_service_included")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        currency: row.try_get("currency")?,
        ..Default::default()
    };

    for category in RateCategory::ALL {
        *record.charge_mut(category) = ChargedRate {
            rate: row.try_get(category.rate_column())?,
            interval: row.try_get(category.interval_column())?,
        };
    }

    let id: i32 = row.try_get("id")?;
    Ok(StoredRate {
        id: i64::from(id),
        record,
    })
}

/// Country row from database
#[derive(Debug, sqlx::FromRow)]
struct CountryRow {
    name: Option<String>,
    alpha_2: Option<String>,
    alpha_3: Option<String>,
    country_code: Option<String>,
    iso_3166_2: Option<String>,
    region: Option<String>,
    sub_region: Option<String>,
    intermediate_region: Option<String>,
    region_code: Option<String>,
    sub_region_code: Option<String>,
    intermediate_region_code: Option<String>,
    custom_name: Option<String>,
}

impl From<CountryRow> for CountryRef {
    fn from(row: CountryRow) -> Self {
        CountryRef {
            name: row.name,
            alpha_2: row.alpha_2,
            alpha_3: row.alpha_3,
            country_code: row.country_code,
            iso_3166_2: row.iso_3166_2,
            region: row.region,
            sub_region: row.sub_region,
            intermediate_region: row.intermediate_region,
            region_code: row.region_code,
            sub_region_code: row.sub_region_code,
            intermediate_region_code: row.intermediate_region_code,
            custom_name: row.custom_name,
        }
    }
}

/// Template row from database
#[derive(Debug, sqlx::FromRow)]
struct TemplateRow {
    destination: Option<String>,
    area_code: Option<String>,
    rate: Option<f64>,
    tariff_name: Option<String>,
    date: Option<chrono::NaiveDate>,
    rounding_rules: Option<String>,
    destination_type: Option<String>,
    setup_rate: Option<f64>,
    calls_type: Option<String>,
    remarks: Option<String>,
}

impl From<TemplateRow> for DestinationTemplate {
    fn from(row: TemplateRow) -> Self {
        DestinationTemplate {
            destination: row.destination,
            area_code: row.area_code,
            rate: row.rate,
            tariff_name: row.tariff_name,
            date: row.date,
            rounding_rules: row.rounding_rules,
            destination_type: row.destination_type,
            setup_rate: row.setup_rate,
            calls_type: row.calls_type,
            remarks: row.remarks,
        }
    }
}

/// `ratesheet_v2.id` is SERIAL; ids outside i32 cannot name a row
fn serial_id(id: i64) -> Option<i32> {
    i32::try_from(id).ok()
}

fn db_error(context: &str) -> impl FnOnce(sqlx::Error) -> RatecardError + '_ {
    move |e| RatecardError::DatabaseError(format!("{context}: {e}"))
}

/// PostgreSQL ratesheet store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store connection
    pub async fn connect(database_url: &str, pool_size: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .connect(database_url)
            .await
            .map_err(db_error("PostgreSQL connection failed"))?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create missing tables
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to apply schema"))?;
        Ok(())
    }
}

#[async_trait]
impl RateStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn list_rates(&self) -> Result<Vec<StoredRate>> {
        let sql = format!(
            "SELECT id, {} FROM ratesheet_v2 ORDER BY id",
            rate_columns().join(", ")
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list rates"))?;

        rows.iter()
            .map(rate_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(db_error("Failed to decode rate"))
    }

    async fn get_rate(&self, id: i64) -> Result<Option<StoredRate>> {
        let Some(id) = serial_id(id) else {
            return Ok(None);
        };
        let sql = format!(
            "SELECT id, {} FROM ratesheet_v2 WHERE id = $1",
            rate_columns().join(", ")
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get rate"))?;

        row.as_ref()
            .map(rate_from_row)
            .transpose()
            .map_err(db_error("Failed to decode rate"))
    }

    async fn update_rate(&self, id: i64, record: &RateRecord) -> Result<()> {
        let not_found = || RatecardError::RecordNotFound(format!("ratesheet record {id}"));
        let row_id = serial_id(id).ok_or_else(not_found)?;
        let columns = rate_columns();
        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{col} = ${}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE ratesheet_v2 SET {assignments} WHERE id = ${}",
            columns.len() + 1
        );

        let result = bind_rate(sqlx::query(&sql), record)
            .bind(row_id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to update rate"))?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        Ok(())
    }

    async fn list_countries(&self) -> Result<Vec<CountryRef>> {
        let sql = format!("SELECT {COUNTRY_COLUMNS} FROM country_v2 ORDER BY id");
        let rows: Vec<CountryRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list countries"))?;

        Ok(rows.into_iter().map(CountryRef::from).collect())
    }

    async fn list_templates(&self) -> Result<Vec<DestinationTemplate>> {
        let sql = format!(r#"SELECT {TEMPLATE_COLUMNS} FROM "template" ORDER BY id"#);
        let rows: Vec<TemplateRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list templates"))?;

        Ok(rows.into_iter().map(DestinationTemplate::from).collect())
    }

    async fn list_rate_bags(&self) -> Result<Vec<RateBag>> {
        // JSON (not JSONB) keeps the sheet's header order
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT data::text FROM ratesheet_json ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to list ratesheet rows"))?;

        rows.into_iter()
            .map(|(data,)| {
                serde_json::from_str(&data)
                    .map(|fields| RateBag { fields })
                    .map_err(|e| RatecardError::DatabaseError(format!("Invalid ratesheet row: {e}")))
            })
            .collect()
    }

    async fn count(&self, table: Table) -> Result<u64> {
        let sql = format!(r#"SELECT COUNT(*) FROM "{}""#, table.name());
        let (n,): (i64,) = sqlx::query_as(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count rows"))?;
        Ok(n.max(0) as u64)
    }
}

/// Open PostgreSQL transaction; sqlx rolls back on drop
struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn truncate(&mut self, table: Table) -> Result<()> {
        let sql = format!(r#"TRUNCATE TABLE "{}" RESTART IDENTITY"#, table.name());
        sqlx::query(&sql)
            .execute(&mut *self.tx)
            .await
            .map_err(db_error("Failed to truncate"))?;
        Ok(())
    }

    async fn insert(&mut self, row: &TableRow) -> Result<()> {
        match row {
            TableRow::Rate(record) => {
                let columns = rate_columns();
                let sql = format!(
                    "INSERT INTO ratesheet_v2 ({}) VALUES ({})",
                    columns.join(", "),
                    placeholders(1, columns.len())
                );
                bind_rate(sqlx::query(&sql), record)
                    .execute(&mut *self.tx)
                    .await
                    .map_err(db_error("Failed to insert rate"))?;
            }
            TableRow::Country(c) => {
                let sql = format!(
                    "INSERT INTO country_v2 ({COUNTRY_COLUMNS}) VALUES ({})",
                    placeholders(1, 12)
                );
                sqlx::query(&sql)
                    .bind(&c.name)
                    .bind(&c.alpha_2)
                    .bind(&c.alpha_3)
                    .bind(&c.country_code)
                    .bind(&c.iso_3166_2)
                    .bind(&c.region)
                    .bind(&c.sub_region)
                    .bind(&c.intermediate_region)
                    .bind(&c.region_code)
                    .bind(&c.sub_region_code)
                    .bind(&c.intermediate_region_code)
                    .bind(&c.custom_name)
                    .execute(&mut *self.tx)
                    .await
                    .map_err(db_error("Failed to insert country"))?;
            }
            TableRow::Template(t) => {
                let sql = format!(
                    r#"INSERT INTO "template" ({TEMPLATE_COLUMNS}) VALUES ({})"#,
                    placeholders(1, 10)
                );
                sqlx::query(&sql)
                    .bind(&t.destination)
                    .bind(&t.area_code)
                    .bind(t.rate)
                    .bind(&t.tariff_name)
                    .bind(t.date)
                    .bind(&t.rounding_rules)
                    .bind(&t.destination_type)
                    .bind(t.setup_rate)
                    .bind(&t.calls_type)
                    .bind(&t.remarks)
                    .execute(&mut *self.tx)
                    .await
                    .map_err(db_error("Failed to insert template"))?;
            }
            TableRow::Bag(bag) => {
                let data = serde_json::to_string(&bag.fields).map_err(|e| {
                    RatecardError::DatabaseError(format!("Failed to encode ratesheet row: {e}"))
                })?;
                sqlx::query("INSERT INTO ratesheet_json (data) VALUES ($1::json)")
                    .bind(data)
                    .execute(&mut *self.tx)
                    .await
                    .map_err(db_error("Failed to insert ratesheet row"))?;
            }
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(db_error("Failed to commit"))
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx
            .rollback()
            .await
            .map_err(db_error("Failed to roll back"))
    }
}
