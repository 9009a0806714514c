//! Receipt and kitchen ticket rendering, thermal bridge links and print server jobs

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use shared::models::{
    status_label, Currency, DiningTable, Establishment, Order, OrderType, OrderWithItems,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::PrintingConfig;
use crate::error::{AppError, AppResult};
use crate::external::print_server::{
    PrintContentType, PrintJob, PrintJobAccepted, PrintServerClient, PrintServerStatus, PrinterInfo,
};
use crate::services::order::load_order_with_items;

/// Thermal paper roll width
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    #[default]
    #[serde(rename = "80mm")]
    Mm80,
    #[serde(rename = "58mm")]
    Mm58,
}

impl PaperSize {
    fn css_width(&self) -> &'static str {
        match self {
            PaperSize::Mm80 => "80mm",
            PaperSize::Mm58 => "58mm",
        }
    }

    /// Characters per line in the printer's default font
    pub fn columns(&self) -> usize {
        match self {
            PaperSize::Mm80 => 48,
            PaperSize::Mm58 => 32,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PrintOptions {
    #[serde(default)]
    pub paper: PaperSize,
}

/// Which document to produce for an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    Receipt,
    Kitchen,
}

#[derive(Debug, Deserialize)]
pub struct PrintRequest {
    pub printer: String,
    pub ticket: TicketKind,
    #[serde(default = "one")]
    pub copies: u8,
    #[serde(default)]
    pub paper: PaperSize,
}

fn one() -> u8 {
    1
}

#[derive(Debug, Serialize)]
pub struct BridgeLink {
    pub url: String,
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn order_heading(order: &Order, table: Option<&DiningTable>) -> String {
    match (order.order_type, table) {
        (OrderType::Table, Some(table)) => format!("#{} - {}", order.order_number, table.display_name()),
        _ => format!("#{} - {}", order.order_number, order.order_type.label()),
    }
}

const RECEIPT_STYLE: &str = "body{font-family:monospace;font-size:12px;margin:0 auto;padding:4mm;}\
h1{font-size:16px;text-align:center;margin:0 0 4px;}\
h2{font-size:14px;margin:6px 0;}\
.muted{color:#555;}\
.row{display:flex;justify-content:space-between;}\
.addon{padding-left:12px;}\
.note{padding-left:12px;font-style:italic;}\
.total{font-weight:bold;font-size:14px;}\
hr{border:none;border-top:1px dashed #000;}\
@media print{@page{margin:0;}}";

fn html_document(title: &str, paper: PaperSize, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title>\
<style>{}body{{width:{};}}</style></head><body>{}</body></html>",
        escape_html(title),
        RECEIPT_STYLE,
        paper.css_width(),
        body
    )
}

fn row(left: &str, right: &str) -> String {
    format!("<div class=\"row\"><span>{}</span><span>{}</span></div>", left, right)
}

/// Customer receipt for the browser print window
pub fn render_receipt_html(
    establishment: &Establishment,
    order: &OrderWithItems,
    table: Option<&DiningTable>,
    options: &PrintOptions,
) -> String {
    let currency = establishment.currency;
    let o = &order.order;
    let mut body = String::new();

    body.push_str(&format!("<h1>{}</h1>", escape_html(&establishment.name)));
    if let Some(address) = establishment.address.as_deref() {
        body.push_str(&format!("<div class=\"muted\">{}</div>", escape_html(address)));
    }
    if let Some(phone) = establishment.phone.as_deref() {
        body.push_str(&format!("<div class=\"muted\">{}</div>", escape_html(phone)));
    }
    body.push_str("<hr>");
    body.push_str(&format!("<h2>{}</h2>", escape_html(&order_heading(o, table))));
    body.push_str(&format!(
        "<div class=\"muted\">{}</div>",
        o.created_at.format("%d/%m/%Y %H:%M")
    ));
    if let Some(name) = o.customer_name.as_deref() {
        body.push_str(&format!("<div>{}</div>", escape_html(name)));
    }
    if let Some(phone) = o.customer_phone.as_deref() {
        body.push_str(&format!("<div>{}</div>", escape_html(phone)));
    }
    if o.order_type == OrderType::Delivery {
        if let Some(address) = o.delivery_address.as_deref() {
            body.push_str(&format!("<div>{}</div>", escape_html(address)));
        }
    }
    body.push_str("<hr>");

    for entry in &order.items {
        let item = &entry.item;
        body.push_str(&row(
            &format!("{}x {}", item.quantity, escape_html(&item.product_name)),
            &currency.format(item.total_price),
        ));
        for addon in &entry.addons {
            body.push_str(&format!(
                "<div class=\"addon\">+ {}x {} ({})</div>",
                addon.quantity,
                escape_html(&addon.addon_name),
                currency.format(addon.unit_price)
            ));
        }
        if let Some(notes) = item.notes.as_deref() {
            body.push_str(&format!("<div class=\"note\">{}</div>", escape_html(notes)));
        }
    }
    body.push_str("<hr>");

    body.push_str(&row("Subtotal", &currency.format(o.subtotal)));
    if !o.delivery_fee.is_zero() {
        body.push_str(&row("Delivery fee", &currency.format(o.delivery_fee)));
    }
    if !o.discount.is_zero() {
        body.push_str(&row("Discount", &format!("-{}", currency.format(o.discount))));
    }
    body.push_str(&format!(
        "<div class=\"row total\"><span>Total</span><span>{}</span></div>",
        currency.format(o.total)
    ));

    if let Some(method) = o.payment_method {
        body.push_str(&row("Payment", method.label()));
        if let Some(tendered) = o.cash_tendered {
            body.push_str(&row("Cash", &currency.format(tendered)));
            if tendered > o.total {
                body.push_str(&row("Change", &currency.format(tendered - o.total)));
            }
        }
    }
    if let Some(notes) = o.notes.as_deref() {
        body.push_str("<hr>");
        body.push_str(&format!("<div class=\"note\">{}</div>", escape_html(notes)));
    }

    html_document(&format!("Order #{}", o.order_number), options.paper, &body)
}

/// Kitchen ticket: what to prepare, without prices
pub fn render_kitchen_ticket_html(order: &OrderWithItems, table: Option<&DiningTable>, options: &PrintOptions) -> String {
    let o = &order.order;
    let mut body = String::new();

    body.push_str(&format!("<h1>{}</h1>", escape_html(&order_heading(o, table))));
    body.push_str(&format!(
        "<div class=\"muted\">{} - {}</div>",
        o.created_at.format("%H:%M"),
        status_label(o.order_type, o.status)
    ));
    if let Some(name) = o.customer_name.as_deref() {
        body.push_str(&format!("<div>{}</div>", escape_html(name)));
    }
    body.push_str("<hr>");

    for entry in &order.items {
        body.push_str(&format!(
            "<h2>{}x {}</h2>",
            entry.item.quantity,
            escape_html(&entry.item.product_name)
        ));
        for addon in &entry.addons {
            body.push_str(&format!(
                "<div class=\"addon\">+ {}x {}</div>",
                addon.quantity,
                escape_html(&addon.addon_name)
            ));
        }
        if let Some(notes) = entry.item.notes.as_deref() {
            body.push_str(&format!("<div class=\"note\">{}</div>", escape_html(notes)));
        }
    }
    if let Some(notes) = o.notes.as_deref() {
        body.push_str("<hr>");
        body.push_str(&format!("<div class=\"note\">{}</div>", escape_html(notes)));
    }

    html_document(&format!("Kitchen #{}", o.order_number), options.paper, &body)
}

/// Fixed-width text layout for thermal printers
struct TextTicket {
    buf: String,
    width: usize,
}

impl TextTicket {
    fn new(width: usize) -> Self {
        Self {
            buf: String::with_capacity(1024),
            width: width.max(16),
        }
    }

    fn line(&mut self, s: &str) -> &mut Self {
        self.buf.push_str(s);
        self.buf.push('\n');
        self
    }

    fn center(&mut self, s: &str) -> &mut Self {
        let len = s.chars().count();
        if len >= self.width {
            return self.line(s);
        }
        let pad = (self.width - len) / 2;
        let centered = format!("{}{}", " ".repeat(pad), s);
        self.line(&centered)
    }

    fn sep(&mut self) -> &mut Self {
        let dashes = "-".repeat(self.width);
        self.line(&dashes)
    }

    /// Left text and right text on one line, right-aligned to the paper width
    fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let lw = left.chars().count();
        let rw = right.chars().count();
        if lw + rw >= self.width {
            let joined = format!("{} {}", left, right);
            return self.line(&joined);
        }
        let joined = format!("{}{}{}", left, " ".repeat(self.width - lw - rw), right);
        self.line(&joined)
    }

    fn finish(self) -> String {
        self.buf
    }
}

/// Plain-text receipt for the thermal printer bridge
pub fn render_receipt_text(
    establishment: &Establishment,
    order: &OrderWithItems,
    table: Option<&DiningTable>,
    width: usize,
) -> String {
    let currency: Currency = establishment.currency;
    let o = &order.order;
    let mut t = TextTicket::new(width);

    t.center(&establishment.name);
    if let Some(phone) = establishment.phone.as_deref() {
        t.center(phone);
    }
    t.sep();
    t.line(&order_heading(o, table));
    t.line(&o.created_at.format("%d/%m/%Y %H:%M").to_string());
    if let Some(name) = o.customer_name.as_deref() {
        t.line(name);
    }
    if o.order_type == OrderType::Delivery {
        if let Some(address) = o.delivery_address.as_deref() {
            t.line(address);
        }
    }
    t.sep();

    for entry in &order.items {
        let item = &entry.item;
        t.line_lr(
            &format!("{}x {}", item.quantity, item.product_name),
            &currency.format(item.total_price),
        );
        for addon in &entry.addons {
            t.line(&format!("  + {}x {}", addon.quantity, addon.addon_name));
        }
        if let Some(notes) = item.notes.as_deref() {
            t.line(&format!("  > {}", notes));
        }
    }
    t.sep();

    t.line_lr("Subtotal", &currency.format(o.subtotal));
    if !o.delivery_fee.is_zero() {
        t.line_lr("Delivery fee", &currency.format(o.delivery_fee));
    }
    if !o.discount.is_zero() {
        t.line_lr("Discount", &format!("-{}", currency.format(o.discount)));
    }
    t.line_lr("TOTAL", &currency.format(o.total));
    if let Some(method) = o.payment_method {
        t.line_lr("Payment", method.label());
        if let Some(tendered) = o.cash_tendered {
            if tendered > o.total {
                t.line_lr("Change", &currency.format(tendered - o.total));
            }
        }
    }
    if let Some(notes) = o.notes.as_deref() {
        t.sep();
        t.line(notes);
    }
    t.line("");
    t.finish()
}

/// Link handled by the local thermal printer bridge app
pub fn bridge_link(scheme: &str, text: &str) -> String {
    format!(
        "{}://print?format=text&data={}",
        scheme,
        URL_SAFE_NO_PAD.encode(text.as_bytes())
    )
}

#[derive(Clone)]
pub struct PrintingService {
    db: PgPool,
    client: PrintServerClient,
    config: PrintingConfig,
}

/// An order with everything needed to render it
struct Printable {
    establishment: Establishment,
    order: OrderWithItems,
    table: Option<DiningTable>,
}

impl PrintingService {
    pub fn new(db: PgPool, client: PrintServerClient, config: PrintingConfig) -> Self {
        Self { db, client, config }
    }

    async fn load(&self, establishment_id: Uuid, order_id: Uuid) -> AppResult<Printable> {
        let mut conn = self.db.acquire().await?;

        let establishment = sqlx::query_as::<_, Establishment>("SELECT * FROM establishments WHERE id = $1")
            .bind(establishment_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Establishment".to_string()))?;

        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND establishment_id = $2")
            .bind(order_id)
            .bind(establishment_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let table = match order.table_id {
            Some(table_id) => {
                sqlx::query_as::<_, DiningTable>("SELECT * FROM dining_tables WHERE id = $1")
                    .bind(table_id)
                    .fetch_optional(&mut *conn)
                    .await?
            }
            None => None,
        };

        let order = load_order_with_items(&mut conn, order).await?;
        Ok(Printable {
            establishment,
            order,
            table,
        })
    }

    pub async fn receipt_html(&self, establishment_id: Uuid, order_id: Uuid, options: &PrintOptions) -> AppResult<String> {
        let p = self.load(establishment_id, order_id).await?;
        Ok(render_receipt_html(&p.establishment, &p.order, p.table.as_ref(), options))
    }

    pub async fn kitchen_ticket_html(
        &self,
        establishment_id: Uuid,
        order_id: Uuid,
        options: &PrintOptions,
    ) -> AppResult<String> {
        let p = self.load(establishment_id, order_id).await?;
        Ok(render_kitchen_ticket_html(&p.order, p.table.as_ref(), options))
    }

    pub async fn receipt_text(&self, establishment_id: Uuid, order_id: Uuid) -> AppResult<String> {
        let p = self.load(establishment_id, order_id).await?;
        Ok(render_receipt_text(
            &p.establishment,
            &p.order,
            p.table.as_ref(),
            self.config.paper_width,
        ))
    }

    /// Bridge link carrying the text receipt of an order
    pub async fn bridge_link(&self, establishment_id: Uuid, order_id: Uuid) -> AppResult<BridgeLink> {
        let text = self.receipt_text(establishment_id, order_id).await?;
        Ok(BridgeLink {
            url: bridge_link(&self.config.bridge_scheme, &text),
        })
    }

    pub async fn server_status(&self) -> AppResult<PrintServerStatus> {
        self.client.status().await
    }

    pub async fn list_printers(&self) -> AppResult<Vec<PrinterInfo>> {
        self.client.list_printers().await
    }

    /// Render an order ticket and send it to a printer of the print server
    pub async fn print_order(
        &self,
        establishment_id: Uuid,
        order_id: Uuid,
        request: PrintRequest,
    ) -> AppResult<PrintJobAccepted> {
        let p = self.load(establishment_id, order_id).await?;
        let options = PrintOptions { paper: request.paper };
        let content = match request.ticket {
            TicketKind::Receipt => render_receipt_html(&p.establishment, &p.order, p.table.as_ref(), &options),
            TicketKind::Kitchen => render_kitchen_ticket_html(&p.order, p.table.as_ref(), &options),
        };

        let accepted = self
            .client
            .send_job(&PrintJob {
                printer: request.printer,
                content_type: PrintContentType::Html,
                content,
                copies: request.copies,
            })
            .await?;

        tracing::info!(%establishment_id, %order_id, job_id = %accepted.job_id, "Order sent to print server");
        Ok(accepted)
    }
}
