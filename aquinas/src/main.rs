use chrono::Local;
use clap::Parser;
use log::error;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use aquinas_lib::{ApiConfig, IdentityCode, Student};

use crate::{
    model::StudentModel,
    options::{DataFormat, Fetch, Options},
};

mod model;
mod options;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    env_logger::init();
    let args = Options::parse();

    let result = run(args).await;
    if let Err(err) = &result {
        error!("{err}");
    }
    result
}

async fn run(args: Options) -> Result<(), Error> {
    let password = SecretString::new(args.password);

    let mut config = ApiConfig::default();
    if let Some(base_url) = args.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(namespace) = args.namespace {
        config = config.with_namespace(namespace);
    }
    if let Some(timeout) = args.timeout {
        config = config.with_timeout(timeout);
    }

    let cancel = CancellationToken::new();
    let transport = aquinas_lib::https_client();
    let student = match args.fetch {
        Fetch::All => {
            aquinas_lib::fetch_student(transport, &args.code, &password, config, &cancel).await?
        }
        only => {
            let code: IdentityCode = args.code.parse()?;
            let mut student = Student::new(transport, config, &code);
            student.authenticate(&password, &cancel).await?;
            match only {
                Fetch::Details => student.fetch_details(&cancel).await?,
                _ => student.fetch_timetable(&cancel).await?,
            }
            student
        }
    };

    let today = args.today.then(|| Local::now().date_naive());
    let model = StudentModel::new(&student, today);
    let result = match args.format {
        DataFormat::Json => match args.pretty {
            true => serde_json::to_string_pretty(&model)?,
            false => serde_json::to_string(&model)?,
        },
    };
    println!("{result}");

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    SessionError(#[from] aquinas_lib::SessionError),
    #[error(transparent)]
    InvalidIdentityCode(#[from] aquinas_lib::ParseIdError),
    #[error(transparent)]
    FetchFailed(#[from] aquinas_lib::FetchError),
    #[error(transparent)]
    JsonSerializeFailed(#[from] serde_json::Error),
}
