//! `add-product`: lists a product through `POST /products`.

use clap::Args;
use domain::{Money, NewProduct, Product};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::CliError;

#[derive(Debug, Args)]
pub(crate) struct AddProductArgs {
    /// Product name; prompted for when omitted
    #[arg(long)]
    pub(crate) name: Option<String>,

    /// Unit price such as `19.99`; prompted for when omitted
    #[arg(long)]
    pub(crate) price: Option<String>,

    /// Units in stock
    #[arg(long, default_value_t = 0)]
    pub(crate) stock: u32,

    #[arg(long, default_value = "")]
    pub(crate) category: String,

    #[arg(long, default_value = "")]
    pub(crate) description: String,
}

pub(crate) async fn run(
    client: &reqwest::Client,
    api_url: &str,
    token: Option<&str>,
    args: AddProductArgs,
) -> Result<(), CliError> {
    let mut input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    let product = resolve(args, &mut input, &mut output).await?;

    let response = request(client, api_url, token, &product).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        return Err(CliError::Api {
            status: status.as_u16(),
            message: body["message"].as_str().unwrap_or("no message").to_string(),
        });
    }

    let created: Product = response.json().await?;
    tracing::debug!(product_id = %created.id, "product created");
    println!("Product added: {}", serde_json::to_string_pretty(&created).unwrap_or_default());
    Ok(())
}

/// Fills in missing fields by prompting, then builds the request body.
async fn resolve<R, W>(args: AddProductArgs, input: &mut R, output: &mut W) -> Result<NewProduct, CliError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let name = match args.name {
        Some(name) => name,
        None => prompt("Product Name: ", input, output).await?,
    };
    if name.trim().is_empty() {
        return Err(CliError::InvalidInput("product name must not be empty".to_string()));
    }

    let price = match args.price {
        Some(price) => price,
        None => prompt("Product Price: ", input, output).await?,
    };

    Ok(NewProduct {
        name: name.trim().to_string(),
        description: args.description,
        price: parse_price(&price)?,
        stock: args.stock,
        category: args.category,
    })
}

async fn prompt<R, W>(label: &str, input: &mut R, output: &mut W) -> Result<String, CliError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output.write_all(label.as_bytes()).await?;
    output.flush().await?;

    let mut line = String::new();
    if input.read_line(&mut line).await? == 0 {
        return Err(CliError::InvalidInput(format!(
            "no value given for {}",
            label.trim_end_matches([':', ' '])
        )));
    }
    Ok(line.trim().to_string())
}

/// Parses a decimal amount with at most two fractional digits.
fn parse_price(raw: &str) -> Result<Money, CliError> {
    let invalid = || CliError::InvalidInput(format!("{raw:?} is not a price like 19.99"));
    let raw_trimmed = raw.trim();

    let (units, fraction) = raw_trimmed.split_once('.').unwrap_or((raw_trimmed, ""));
    if units.is_empty() || fraction.len() > 2 {
        return Err(invalid());
    }
    if !units.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let units: i64 = units.parse().map_err(|_| invalid())?;
    let fraction: i64 = format!("{fraction:0<2}").parse().map_err(|_| invalid())?;
    units
        .checked_mul(100)
        .and_then(|cents| cents.checked_add(fraction))
        .map(Money::from_cents)
        .ok_or_else(invalid)
}

fn request(
    client: &reqwest::Client,
    api_url: &str,
    token: Option<&str>,
    product: &NewProduct,
) -> reqwest::RequestBuilder {
    let url = format!("{}/products", api_url.trim_end_matches('/'));
    let builder = client.post(url).json(product);
    match token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}
