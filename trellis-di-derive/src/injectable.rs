use crate::attributes::{DefaultDefinition, FieldAttributes};
use itertools::Itertools;
use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Data, DataStruct, DeriveInput, Error, Field, Fields, FieldsNamed, FieldsUnnamed, Result};

const INJECT: &str = "inject";

fn generate_construction(field: &Field) -> Result<TokenStream> {
    let ty = &field.ty;

    for attr in &field.attrs {
        if attr.path().is_ident(INJECT) {
            let attributes = FieldAttributes::try_from(attr)?;
            match (&attributes.default, &attributes.name) {
                (Some(DefaultDefinition::Expr(path)), _) => return Ok(quote!(#path())),
                (Some(DefaultDefinition::Default), _) => {
                    return Ok(quote!(std::default::Default::default()))
                }
                (None, Some(name)) => {
                    return Ok(quote! {
                        <#ty as trellis_di::injectable::FromScope>::from_scope_named(scope, #name)?
                    })
                }
                _ => {}
            }
        }
    }

    Ok(quote! {
        <#ty as trellis_di::injectable::FromScope>::from_scope(scope)?
    })
}

fn make_named_struct(fields: &FieldsNamed) -> Result<TokenStream> {
    let fields: Vec<_> = fields
        .named
        .iter()
        .map(|field| -> Result<TokenStream> {
            let ident = &field.ident;
            let instance = generate_construction(field)?;
            Ok(quote! {
                #ident: #instance
            })
        })
        .try_collect()?;

    Ok(quote! {
        Self {
            #(#fields),*
        }
    })
}

fn make_unnamed_struct(fields: &FieldsUnnamed) -> Result<TokenStream> {
    let fields: Vec<_> = fields
        .unnamed
        .iter()
        .map(generate_construction)
        .try_collect()?;

    Ok(quote! {
        Self(#(#fields),*)
    })
}

pub fn expand_injectable(input: &DeriveInput) -> Result<TokenStream> {
    if let Data::Struct(DataStruct { fields, .. }) = &input.data {
        let ident = &input.ident;
        let (impl_generics, type_generics, where_clause) = input.generics.split_for_impl();
        let generation = match fields {
            Fields::Named(fields) => make_named_struct(fields)?,
            Fields::Unnamed(fields) => make_unnamed_struct(fields)?,
            Fields::Unit => quote! { Self },
        };

        Ok(quote! {
            #[automatically_derived]
            impl #impl_generics trellis_di::injectable::Injectable for #ident #type_generics #where_clause {
                #[allow(unused_variables)]
                fn create(
                    scope: &trellis_di::scope::InjectionScope<'_>,
                ) -> Result<Self, trellis_di::instance::ErrorPtr> {
                    Ok(#generation)
                }
            }
        })
    } else {
        Err(Error::new(
            input.span(),
            "Can only derive Injectable on structs!",
        ))
    }
}
