//! Browser delivery: download through a Blob URL, or open it in a new tab.

use async_trait::async_trait;
use flowdesign_designer::export::{Delivery, DeliveryError};
use wasm_bindgen::JsCast;
use web_sys::{Blob, BlobPropertyBag, HtmlElement, Url};

const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserDelivery;

fn pdf_url(bytes: &[u8]) -> Result<String, String> {
    let data = js_sys::Uint8Array::from(bytes);
    let parts = js_sys::Array::of1(&data);
    let options = BlobPropertyBag::new();
    options.set_type(PDF_MIME);
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options)
        .map_err(|e| format!("{e:?}"))?;
    Url::create_object_url_with_blob(&blob).map_err(|e| format!("{e:?}"))
}

fn click_download(url: &str, file_name: &str) -> Result<(), String> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or("No document object available")?;
    let body = document.body().ok_or("No body element")?;

    let anchor = document
        .create_element("a")
        .map_err(|e| format!("{e:?}"))?;
    anchor.set_attribute("href", url).map_err(|e| format!("{e:?}"))?;
    anchor
        .set_attribute("download", file_name)
        .map_err(|e| format!("{e:?}"))?;
    body.append_child(&anchor).map_err(|e| format!("{e:?}"))?;

    let clicked = anchor
        .dyn_ref::<HtmlElement>()
        .map(HtmlElement::click)
        .ok_or_else(|| "Anchor is not an HtmlElement".to_string());
    let _ = body.remove_child(&anchor);
    clicked
}

#[async_trait(?Send)]
impl Delivery for BrowserDelivery {
    async fn download(&self, file_name: &str, bytes: &[u8]) -> Result<String, DeliveryError> {
        let fail = |reason: String| DeliveryError::Download {
            file_name: file_name.to_string(),
            reason,
        };
        let url = pdf_url(bytes).map_err(fail)?;
        let result = click_download(&url, file_name);
        let _ = Url::revoke_object_url(&url);
        result.map_err(fail)?;
        Ok(file_name.to_string())
    }

    async fn open_in_viewer(&self, file_name: &str, bytes: &[u8]) -> Result<String, DeliveryError> {
        let fail = |reason: String| DeliveryError::Viewer {
            file_name: file_name.to_string(),
            reason,
        };
        let url = pdf_url(bytes).map_err(fail)?;
        let window = web_sys::window().ok_or_else(|| fail("No window object available".to_string()))?;
        // The URL stays alive for the new tab
        match window.open_with_url_and_target(&url, "_blank") {
            Ok(Some(_)) => Ok(url),
            Ok(None) => Err(fail("popup blocked".to_string())),
            Err(e) => Err(fail(format!("{e:?}"))),
        }
    }
}
