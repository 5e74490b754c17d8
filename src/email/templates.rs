//! HTML email templates
//!
//! Customer-supplied strings are escaped before interpolation; order
//! fields generated server-side (ids, prices) are trusted.

use bigdecimal::BigDecimal;

const BRAND_COLOR: &str = "#8B4513";
const BODY_STYLE: &str = "font-family: Arial, sans-serif; line-height: 1.6; color: #333; \
     max-width: 600px; margin: 0 auto; padding: 20px;";
const PANEL_STYLE: &str =
    "background-color: #f5f5f5; padding: 20px; border-radius: 8px; margin: 20px 0;";

/// Escape text for safe interpolation into HTML.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn wrap(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\"></head>\n\
         <body style=\"{}\">\n{}\n</body>\n</html>",
        BODY_STYLE, body
    )
}

/// Confirmation sent to the customer right after their order is recorded.
pub fn order_confirmation(
    order_id: &str,
    product_name: &str,
    price: &BigDecimal,
    customer_name: Option<&str>,
) -> String {
    let greeting = match customer_name {
        Some(name) => format!("Hi {},", escape_html(name)),
        None => "Hi there,".to_string(),
    };

    wrap(&format!(
        r#"<h1 style="color: {color};">Order Confirmed!</h1>
<p>{greeting}</p>
<p>Thank you for your order. We've received your payment and will start processing your portraits shortly.</p>
<div style="{panel}">
  <h2 style="margin-top: 0;">Order Details</h2>
  <p><strong>Order ID:</strong> {order_id}</p>
  <p><strong>Product:</strong> {product}</p>
  <p><strong>Amount:</strong> ${price}</p>
  <p><strong>Status:</strong> Processing</p>
</div>
<p>We'll send you another email with download links once your portraits are ready (typically within 24 hours).</p>
<p>If you have any questions, please don't hesitate to contact us.</p>
<p>Best regards,<br>The VignetteLab Studio Team</p>"#,
        color = BRAND_COLOR,
        panel = PANEL_STYLE,
        greeting = greeting,
        order_id = order_id,
        product = escape_html(product_name),
        price = price.with_scale(2),
    ))
}

/// Notification with download links once portraits are generated.
pub fn download_ready(order_id: &str, package_name: &str, download_links: &[String]) -> String {
    let link = download_links.first().map(String::as_str).unwrap_or("#");

    wrap(&format!(
        r#"<h1 style="color: {color};">Your Portraits Are Ready!</h1>
<p>Great news! Your {package} portraits have been processed and are ready for download.</p>
<div style="{panel}">
  <h2 style="margin-top: 0;">Order Details</h2>
  <p><strong>Order ID:</strong> {order_id}</p>
  <p><strong>Package:</strong> {package}</p>
</div>
<div style="margin: 30px 0;">
  <a href="{link}" style="display: inline-block; background-color: {color}; color: white; padding: 12px 24px; text-decoration: none; border-radius: 6px; font-weight: bold;">
    Download Your Portraits
  </a>
</div>
<p style="color: #666; font-size: 14px;">
  <strong>Note:</strong> This download link will expire in 7 days. Please download your portraits soon.
</p>
<p>If you have any questions or need assistance, please don't hesitate to contact us.</p>
<p>Best regards,<br>The VignetteLab Studio Team</p>"#,
        color = BRAND_COLOR,
        panel = PANEL_STYLE,
        package = escape_html(package_name),
        order_id = order_id,
        link = link,
    ))
}

/// Relay of a contact form submission to the admin address. Every field
/// is visitor-supplied and therefore escaped.
pub fn contact_form(name: &str, email: &str, subject: &str, message: &str) -> String {
    wrap(&format!(
        r#"<h1 style="color: {color};">Contact Form Submission</h1>
<p><strong>From:</strong> {name} &lt;{email}&gt;</p>
<p><strong>Subject:</strong> {subject}</p>
<hr style="border: none; border-top: 1px solid #ddd; margin: 20px 0;">
<h2 style="font-size: 16px; margin-top: 0;">Message</h2>
<p style="white-space: pre-wrap;">{message}</p>"#,
        color = BRAND_COLOR,
        name = escape_html(name),
        email = escape_html(email),
        subject = escape_html(subject),
        message = escape_html(message),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn escape_html_neutralizes_markup() {
        assert_eq!(
            escape_html(r#"<script>alert("x & y")</script>"#),
            "&lt;script&gt;alert(&quot;x &amp; y&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn order_confirmation_renders_price_with_two_decimals() {
        let price = BigDecimal::from_str("29.9").unwrap();
        let html = order_confirmation("order-1", "Single Portrait", &price, Some("Jess"));

        assert!(html.contains("$29.90"));
        assert!(html.contains("Hi Jess,"));
        assert!(html.contains("Order Confirmed!"));
    }

    #[test]
    fn order_confirmation_without_name_uses_generic_greeting() {
        let price = BigDecimal::from_str("49.99").unwrap();
        let html = order_confirmation("order-2", "Trio Bundle", &price, None);

        assert!(html.contains("Hi there,"));
    }

    #[test]
    fn contact_form_escapes_visitor_input() {
        let html = contact_form("<b>Eve</b>", "eve@example.com", "Hi & hello", "a<b");

        assert!(!html.contains("<b>Eve</b>"));
        assert!(html.contains("&lt;b&gt;Eve&lt;/b&gt;"));
        assert!(html.contains("Hi &amp; hello"));
        assert!(html.contains("a&lt;b"));
    }

    #[test]
    fn download_ready_links_first_url() {
        let links = vec![
            "https://cdn.example.com/zip1".to_string(),
            "https://cdn.example.com/zip2".to_string(),
        ];
        let html = download_ready("order-3", "Premium Package", &links);

        assert!(html.contains(r#"href="https://cdn.example.com/zip1""#));
        assert!(html.contains("expire in 7 days"));
    }
}
